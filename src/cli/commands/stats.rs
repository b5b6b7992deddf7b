//! Stats command implementation.

use crate::cli::output::{format_count, format_duration};
use crate::cli::Output;
use crate::config::Settings;
use crate::store::Store;
use anyhow::Result;

/// Show collection progress and per-conference aggregates.
pub fn run_stats(settings: &Settings) -> Result<()> {
    let store = Store::open(&settings.database_path())?;
    let progress = store.collection_statistics()?;
    let conferences = store.conference_statistics()?;
    store.close()?;

    Output::header("Collection");
    Output::kv("Collected URLs", &progress.collected_urls.to_string());
    Output::kv("With details", &progress.detailed.to_string());
    Output::kv("Unprocessed", &progress.unprocessed.to_string());

    if progress.collected_urls > 0 {
        let pct = progress.detailed as f64 / progress.collected_urls as f64 * 100.0;
        Output::kv("Progress", &format!("{:.1}%", pct));
    }

    if !progress.by_source_type.is_empty() {
        Output::header("By Source");
        for entry in &progress.by_source_type {
            Output::kv(&entry.label, &entry.count.to_string());
        }
    }

    if !progress.top_channels.is_empty() {
        Output::header("Top Channels");
        for entry in &progress.top_channels {
            Output::list_item(&format!("{} ({} videos)", entry.label, entry.count));
        }
    }

    let overall = &conferences.overall;
    Output::header("Details");
    Output::kv("Videos", &overall.total_videos.to_string());
    Output::kv("Conferences", &overall.unique_conferences.to_string());
    Output::kv("Years", &overall.unique_years.to_string());
    Output::kv(
        "Average views",
        &format_count(overall.avg_views.map(|v| v.round() as i64)),
    );
    Output::kv("Total duration", &format_duration(overall.total_duration_seconds));

    if !conferences.conferences.is_empty() {
        Output::header("Conferences");
        for conf in &conferences.conferences {
            let year = conf
                .conference_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "year unknown".to_string());
            Output::list_item(&format!(
                "{} {}: {} videos, {} avg views, {}",
                conf.conference_name,
                year,
                conf.video_count,
                format_count(conf.avg_views.map(|v| v.round() as i64)),
                format_duration(conf.total_duration_seconds)
            ));
        }
    }

    Ok(())
}
