//! MCP command implementation.

use crate::config::{Settings, ToolProfile};
use crate::mcp::McpServer;
use anyhow::Result;

/// Run the MCP server until stdin closes.
pub async fn run_mcp(profile: Option<ToolProfile>, settings: Settings) -> Result<()> {
    let profile = profile.unwrap_or(settings.server.profile);
    let server = McpServer::new(settings, profile)?;
    server.run().await
}
