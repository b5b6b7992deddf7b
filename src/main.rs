//! yt-harvest CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yt_harvest::cli::{commands, Cli, Commands};
use yt_harvest::config::Settings;
use yt_harvest::source::canonical_video_url;
use yt_harvest::store::{DetailFilter, UrlFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging. stdout carries JSON-RPC in mcp mode, so log to stderr.
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            format!("yt_harvest={}", log_level)
        })))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Mcp { profile } => {
            commands::run_mcp(*profile, settings).await?;
        }

        Commands::Collect {
            urls,
            playlist,
            channel,
        } => {
            let mode = if *playlist {
                commands::CollectMode::Playlist
            } else if *channel {
                commands::CollectMode::Channel
            } else {
                commands::CollectMode::Auto
            };
            commands::run_collect(urls, mode, settings).await?;
        }

        Commands::Extract { urls } => {
            commands::run_extract(urls, settings).await?;
        }

        Commands::Process { limit } => {
            commands::run_process(*limit, settings).await?;
        }

        Commands::List {
            source_type,
            channel_name,
            source_url,
            limit,
        } => {
            let filter = UrlFilter {
                source_type: *source_type,
                channel_name: channel_name.clone(),
                source_url: source_url.clone(),
                limit: Some(*limit),
            };
            commands::run_list(filter, &settings)?;
        }

        Commands::Details {
            video_url,
            conference,
            year,
            limit,
        } => {
            let filter = DetailFilter {
                video_url: video_url.as_deref().map(canonical_video_url).transpose()?,
                conference_name: conference.clone(),
                conference_year: *year,
                limit: Some(*limit),
            };
            commands::run_details(filter, &settings)?;
        }

        Commands::Stats => {
            commands::run_stats(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
