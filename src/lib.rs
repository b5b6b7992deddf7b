//! yt-harvest - YouTube conference talk collector
//!
//! A two-stage pipeline over a local SQLite database: collect video URLs from
//! channels and playlists, then enrich each collected URL with metadata and
//! an inferred conference name and year.
//!
//! # Overview
//!
//! yt-harvest allows you to:
//! - Collect every video URL from a YouTube channel or playlist, idempotently
//! - Extract views, likes, duration and tags for collected videos via yt-dlp
//! - Pick up where you left off: only videos without details are processed
//! - Expose both stages as MCP tools for AI assistants
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `source` - Video source abstraction (yt-dlp, in-memory)
//! - `store` - Record store for URLs and details
//! - `collector` - URL collection from channels and playlists
//! - `enricher` - Detail extraction with retries
//! - `conference` - Conference inference from titles
//! - `pipeline` - Component wiring
//! - `mcp` - MCP tool server
//!
//! # Example
//!
//! ```rust,no_run
//! use yt_harvest::config::Settings;
//! use yt_harvest::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let result = pipeline
//!         .collector()
//!         .auto_collect("https://www.youtube.com/@PyConKRtube")
//!         .await?;
//!     println!("Collected {} new videos", result.inserted);
//!
//!     let outcomes = pipeline.enricher().process_unprocessed(Some(10)).await?;
//!     println!("Extracted details for {} videos", outcomes.len());
//!
//!     pipeline.close()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod collector;
pub mod conference;
pub mod config;
pub mod enricher;
pub mod error;
pub mod mcp;
pub mod pipeline;
pub mod source;
pub mod store;

pub use error::{HarvestError, Result};
