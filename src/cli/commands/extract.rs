//! Extract and process command implementations.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::enricher::ExtractionOutcome;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Extract details for the given URLs.
pub async fn run_extract(urls: &[String], settings: Settings) -> Result<()> {
    preflight::check_extractor(&settings)?;
    let pipeline = Pipeline::new(settings)?;

    let pb = Output::progress_bar(urls.len() as u64, "Extracting details");
    let mut outcomes = Vec::with_capacity(urls.len());
    for url in urls {
        pb.set_message(url.clone());
        let result = pipeline.enricher().extract_details(url).await;
        outcomes.push(ExtractionOutcome {
            url: url.clone(),
            result,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failed = report(&outcomes);
    pipeline.close()?;

    if failed > 0 {
        anyhow::bail!("{} of {} videos failed", failed, outcomes.len());
    }
    Ok(())
}

/// Extract details for collected videos that have none yet.
pub async fn run_process(limit: Option<usize>, settings: Settings) -> Result<()> {
    preflight::check_extractor(&settings)?;
    let limit = limit.unwrap_or(settings.server.process_limit);
    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner(&format!("Processing up to {} unprocessed videos...", limit));
    let outcomes = pipeline.enricher().process_unprocessed(Some(limit)).await;
    spinner.finish_and_clear();

    let outcomes = outcomes?;
    if outcomes.is_empty() {
        Output::info("Nothing to process. Every collected video has details.");
    } else {
        report(&outcomes);
    }

    let remaining = pipeline.store().list_unprocessed()?.len();
    if remaining > 0 {
        Output::info(&format!("{} videos still unprocessed.", remaining));
    }

    pipeline.close()?;
    Ok(())
}

/// Print outcomes and return the number of failures.
fn report(outcomes: &[ExtractionOutcome]) -> usize {
    let mut failed = 0;

    for outcome in outcomes {
        match &outcome.result {
            Ok(stored) => {
                let conference = match (&stored.details.conference_name, stored.details.conference_year) {
                    (Some(name), Some(year)) => format!(" [{} {}]", name, year),
                    (Some(name), None) => format!(" [{}]", name),
                    _ => String::new(),
                };
                Output::success(&format!("{}{}", stored.details.title, conference));
            }
            Err(e) => {
                failed += 1;
                Output::error(&format!("{}: {}", outcome.url, e));
            }
        }
    }

    Output::kv(
        "Extracted",
        &format!("{}/{}", outcomes.len() - failed, outcomes.len()),
    );
    failed
}
