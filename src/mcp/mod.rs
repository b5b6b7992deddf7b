//! MCP (Model Context Protocol) server for yt-harvest.
//!
//! Exposes URL collection and detail extraction as tools to AI assistants.
//! Implements JSON-RPC 2.0 over stdio.

mod args;
mod protocol;
mod server;
mod tools;

pub use server::McpServer;
