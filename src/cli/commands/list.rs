//! List and details command implementations.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{DetailFilter, Store, UrlFilter};
use anyhow::Result;

/// Run the list command.
pub fn run_list(filter: UrlFilter, settings: &Settings) -> Result<()> {
    let store = Store::open(&settings.database_path())?;
    let videos = store.list_urls(&filter)?;

    if videos.is_empty() {
        Output::info("No videos collected yet. Use 'yt-harvest collect <url>' to add some.");
    } else {
        Output::header(&format!("Collected Videos ({})", videos.len()));
        println!();

        for video in &videos {
            Output::video_url(&video.title, &video.url, &video.channel_name);
        }

        println!();
        let unprocessed = store.list_unprocessed()?.len();
        Output::kv("Awaiting details", &unprocessed.to_string());
    }

    store.close()?;
    Ok(())
}

/// Run the details command.
pub fn run_details(filter: DetailFilter, settings: &Settings) -> Result<()> {
    let store = Store::open(&settings.database_path())?;
    let rows = store.list_details(&filter)?;

    if rows.is_empty() {
        Output::info("No matching video details. Use 'yt-harvest process' to extract some.");
    } else {
        Output::header(&format!("Video Details ({})", rows.len()));
        println!();

        for row in &rows {
            let details = &row.details;
            let conference = details.conference_name.as_ref().map(|name| {
                match details.conference_year {
                    Some(year) => format!("{} {}", name, year),
                    None => name.clone(),
                }
            });
            Output::video_details(
                &details.title,
                &details.video_url,
                conference.as_deref(),
                details.view_count,
                details.duration_seconds,
            );
        }
    }

    store.close()?;
    Ok(())
}
