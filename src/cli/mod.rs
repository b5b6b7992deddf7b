//! CLI module for yt-harvest.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::ToolProfile;
use crate::source::SourceType;
use clap::{Parser, Subcommand};

/// yt-harvest - YouTube conference talk collector
///
/// Collects video URLs from channels and playlists, enriches them with
/// metadata via yt-dlp, and serves both stages as MCP tools.
#[derive(Parser, Debug)]
#[command(name = "yt-harvest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "YT_HARVEST_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start MCP server for AI assistant integration
    Mcp {
        /// Tool group to expose (collector, details, all)
        #[arg(short, long)]
        profile: Option<ToolProfile>,
    },

    /// Collect video URLs from channels or playlists
    Collect {
        /// Channel or playlist URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Treat every URL as a playlist
        #[arg(long, conflicts_with = "channel")]
        playlist: bool,

        /// Treat every URL as a channel
        #[arg(long)]
        channel: bool,
    },

    /// Extract details for collected videos
    Extract {
        /// Video URLs or IDs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Extract details for collected videos that have none yet
    Process {
        /// Maximum number of videos to process
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List collected video URLs
    List {
        /// Only channel or playlist sources
        #[arg(short = 't', long)]
        source_type: Option<SourceType>,

        /// Exact channel name
        #[arg(long)]
        channel_name: Option<String>,

        /// Exact source URL
        #[arg(long)]
        source_url: Option<String>,

        /// Maximum number of rows
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Show stored video details
    Details {
        /// Exact video URL
        #[arg(long)]
        video_url: Option<String>,

        /// Conference name (substring, case-insensitive)
        #[arg(short = 'n', long)]
        conference: Option<String>,

        /// Conference year
        #[arg(short, long)]
        year: Option<i32>,

        /// Maximum number of rows
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show collection progress and conference statistics
    Stats,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
