//! Collect command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::collector::{CollectionResult, SourceOutcome};
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// How the command should treat its URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    Auto,
    Channel,
    Playlist,
}

/// Run the collect command.
pub async fn run_collect(urls: &[String], mode: CollectMode, settings: Settings) -> Result<()> {
    preflight::check_extractor(&settings)?;
    let pipeline = Pipeline::new(settings)?;
    let collector = pipeline.collector();

    let outcomes = match mode {
        CollectMode::Auto => {
            let spinner = Output::spinner(&format!("Collecting {} source(s)...", urls.len()));
            let outcomes = collector.collect_many(urls).await;
            spinner.finish_and_clear();
            outcomes
        }
        CollectMode::Channel | CollectMode::Playlist => {
            let mut outcomes = Vec::with_capacity(urls.len());
            for url in urls {
                let spinner = Output::spinner(&format!("Collecting {}...", url));
                let result = if mode == CollectMode::Channel {
                    collector.collect_from_channel(url).await
                } else {
                    collector.collect_from_playlist(url).await
                };
                spinner.finish_and_clear();
                outcomes.push(SourceOutcome {
                    url: url.clone(),
                    result,
                });
            }
            outcomes
        }
    };

    let failed = report(&outcomes);
    pipeline.close()?;

    if failed > 0 {
        anyhow::bail!("{} of {} sources failed", failed, urls.len());
    }

    Ok(())
}

/// Print each outcome, returning how many sources failed.
fn report(outcomes: &[SourceOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(result) => print_result(result),
            Err(e) => {
                failed += 1;
                Output::error(&format!("Failed to collect {}: {}", outcome.url, e));
            }
        }
    }
    failed
}

fn print_result(result: &CollectionResult) {
    Output::success(&format!(
        "Collected {} ({}): {} new, {} already known",
        result.source_url, result.source_type, result.inserted, result.skipped
    ));

    if !result.errors.is_empty() {
        Output::warning(&format!("{} entries could not be collected:", result.errors.len()));
        for error in &result.errors {
            Output::list_item(&format!("{}: {}", error.reference, error.message));
        }
    }
}
