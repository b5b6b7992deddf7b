//! Detail enrichment for collected video URLs.

use crate::conference::{find_year, infer_conference, Conference};
use crate::config::ExtractorSettings;
use crate::error::{HarvestError, Result};
use crate::source::{canonical_video_url, VideoMetadata, VideoSource};
use crate::store::{StoredVideoDetails, Store, VideoDetails};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, info, instrument, warn};

/// Upper bound for a single backoff delay.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Backoff settings for metadata fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Unit delay; the n-th retry waits `2^n` units.
    pub delay_ms: u64,
}

impl RetryPolicy {
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.delay_ms)
            .max_delay(MAX_RETRY_DELAY)
            .take(self.max_retries)
    }
}

impl From<&ExtractorSettings> for RetryPolicy {
    fn from(settings: &ExtractorSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            delay_ms: settings.retry_delay_ms,
        }
    }
}

/// Result of enriching one URL in a batch.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub url: String,
    pub result: Result<StoredVideoDetails>,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetches metadata for collected URLs and stores the details.
pub struct Enricher {
    store: Arc<Store>,
    source: Arc<dyn VideoSource>,
    retry: RetryPolicy,
}

impl Enricher {
    pub fn new(store: Arc<Store>, source: Arc<dyn VideoSource>, retry: RetryPolicy) -> Self {
        Self {
            store,
            source,
            retry,
        }
    }

    /// Fetch, enrich and store the details of one collected video.
    #[instrument(skip(self))]
    pub async fn extract_details(&self, video_url: &str) -> Result<StoredVideoDetails> {
        let url = canonical_video_url(video_url)?;

        if self.store.get_url(&url)?.is_none() {
            return Err(HarvestError::NotFound(format!(
                "{} has not been collected yet",
                url
            )));
        }

        let metadata = self.fetch_with_retry(&url).await?;
        let details = build_details(&url, metadata);

        let inserted = self.store.upsert_detail(&details)?;
        debug!(inserted, "Stored details for {}", url);

        self.store.get_detail(&url)?.ok_or_else(|| {
            HarvestError::Store(format!("Details for {} missing after write", url))
        })
    }

    /// Enrich each URL independently, in order.
    pub async fn batch_extract(&self, urls: &[String]) -> Vec<ExtractionOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            let result = self.extract_details(url).await;
            if let Err(e) = &result {
                warn!("Failed to extract {}: {}", url, e);
            }
            outcomes.push(ExtractionOutcome {
                url: url.clone(),
                result,
            });
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!("Extracted {}/{} videos", succeeded, outcomes.len());

        outcomes
    }

    /// Enrich collected URLs that have no details yet, newest first.
    #[instrument(skip(self))]
    pub async fn process_unprocessed(&self, limit: Option<usize>) -> Result<Vec<ExtractionOutcome>> {
        let mut pending = self.store.list_unprocessed()?;
        if let Some(limit) = limit {
            pending.truncate(limit);
        }

        if pending.is_empty() {
            info!("No unprocessed videos");
            return Ok(Vec::new());
        }

        Ok(self.batch_extract(&pending).await)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<VideoMetadata> {
        let mut attempt = 0usize;

        RetryIf::spawn(
            self.retry.strategy(),
            || {
                attempt += 1;
                if attempt > 1 {
                    debug!("Retrying {} (attempt {})", url, attempt);
                }
                self.source.fetch_video_metadata(url)
            },
            |e: &HarvestError| e.is_transient(),
        )
        .await
    }
}

/// Turn fetched metadata into a details row, inferring the conference.
///
/// The title decides the name when it names one; the description and channel
/// fill in whatever the title leaves out.
fn build_details(video_url: &str, metadata: VideoMetadata) -> VideoDetails {
    let context = format!(
        "{} {} {}",
        metadata.title,
        metadata.description,
        metadata.channel_name.as_deref().unwrap_or_default()
    );

    let conference = match infer_conference(&metadata.title) {
        Some(Conference { name, year: None }) => Some(Conference {
            name,
            year: find_year(&context),
        }),
        Some(found) => Some(found),
        None => infer_conference(&context),
    };

    let (conference_name, conference_year) = match conference {
        Some(Conference { name, year }) => (Some(name), year),
        None => (None, None),
    };

    VideoDetails {
        video_url: video_url.to_string(),
        video_id: metadata.id,
        title: metadata.title,
        description: metadata.description,
        channel_name: metadata.channel_name,
        upload_date: metadata.upload_date,
        duration_seconds: metadata.duration_seconds,
        view_count: metadata.view_count,
        like_count: metadata.like_count,
        comment_count: metadata.comment_count,
        conference_name,
        conference_year,
        tags: metadata.tags,
        thumbnail_url: metadata.thumbnail_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, ScriptedFailure, SourceType};
    use crate::store::NewVideoUrl;

    const A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
    const B: &str = "https://www.youtube.com/watch?v=bbbbbbbbbbb";
    const C: &str = "https://www.youtube.com/watch?v=ccccccccccc";

    fn metadata(id: &str, title: &str) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            title: title.to_string(),
            description: "Recorded live".to_string(),
            channel_name: Some("PyCon Korea".to_string()),
            view_count: Some(1200),
            duration_seconds: Some(1800),
            tags: vec!["python".to_string()],
            ..Default::default()
        }
    }

    fn collect(store: &Store, url: &str) {
        store
            .upsert_url(&NewVideoUrl {
                url: url.to_string(),
                title: "Talk".to_string(),
                channel_name: "PyCon Korea".to_string(),
                source_type: SourceType::Playlist,
                source_url: "https://www.youtube.com/playlist?list=PL1".to_string(),
            })
            .unwrap();
    }

    fn enricher(source: MemorySource, retries: usize) -> (Arc<Store>, Arc<MemorySource>, Enricher) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let source = Arc::new(source);
        let retry = RetryPolicy {
            max_retries: retries,
            delay_ms: 0,
        };
        let enricher = Enricher::new(store.clone(), source.clone(), retry);
        (store, source, enricher)
    }

    #[tokio::test]
    async fn test_extract_details_infers_conference() {
        let source = MemorySource::new().with_video(metadata("aaaaaaaaaaa", "PyCon KR 2024 키노트"));
        let (store, _, enricher) = enricher(source, 0);
        collect(&store, A);

        let stored = enricher.extract_details("aaaaaaaaaaa").await.unwrap();
        assert_eq!(stored.details.video_url, A);
        assert_eq!(stored.details.conference_name.as_deref(), Some("PyCon KR"));
        assert_eq!(stored.details.conference_year, Some(2024));
        assert_eq!(stored.details.view_count, Some(1200));
        assert!(store.list_unprocessed().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conference_from_channel_when_title_is_plain() {
        let mut meta = metadata("aaaaaaaaaaa", "Typing in practice");
        meta.description = "Seoul, 2023".to_string();
        meta.channel_name = Some("PyCon Korea".to_string());
        let (store, _, enricher) = enricher(MemorySource::new().with_video(meta), 0);
        collect(&store, A);

        let stored = enricher.extract_details(A).await.unwrap();
        assert_eq!(stored.details.conference_name.as_deref(), Some("PyCon KR"));
        assert_eq!(stored.details.conference_year, Some(2023));
    }

    #[tokio::test]
    async fn test_year_from_description_when_title_has_none() {
        let mut meta = metadata("aaaaaaaaaaa", "PyCon KR keynote: async in practice");
        meta.description = "Recorded at PyCon KR 2023".to_string();
        let (store, _, enricher) = enricher(MemorySource::new().with_video(meta), 0);
        collect(&store, A);

        let stored = enricher.extract_details(A).await.unwrap();
        assert_eq!(stored.details.conference_name.as_deref(), Some("PyCon KR"));
        assert_eq!(stored.details.conference_year, Some(2023));
    }

    #[tokio::test]
    async fn test_uncollected_url_is_not_found() {
        let source = MemorySource::new().with_video(metadata("aaaaaaaaaaa", "Talk"));
        let (_, source, enricher) = enricher(source, 0);

        let err = enricher.extract_details(A).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(source.fetch_count(A), 0);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let source = MemorySource::new().with_video(metadata("aaaaaaaaaaa", "Talk"));
        let (store, _, enricher) = enricher(source, 0);
        collect(&store, A);

        let outcomes = enricher
            .batch_extract(&[A.to_string(), "definitely not a url".to_string()])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[1].result.as_ref().unwrap_err().kind(), "invalid_input");
        assert!(store.get_detail(A).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let source = MemorySource::new().with_failure(A, ScriptedFailure::NotFound);
        let (store, source, enricher) = enricher(source, 3);
        collect(&store, A);

        let err = enricher.extract_details(A).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(source.fetch_count(A), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let source = MemorySource::new()
            .with_video(metadata("aaaaaaaaaaa", "Talk"))
            .with_failure(A, ScriptedFailure::Transient(2));
        let (store, source, enricher) = enricher(source, 2);
        collect(&store, A);

        enricher.extract_details(A).await.unwrap();
        assert_eq!(source.fetch_count(A), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let source = MemorySource::new()
            .with_video(metadata("aaaaaaaaaaa", "Talk"))
            .with_failure(A, ScriptedFailure::Transient(5));
        let (store, source, enricher) = enricher(source, 1);
        collect(&store, A);

        let err = enricher.extract_details(A).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(source.fetch_count(A), 2);
        assert!(store.get_detail(A).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_process_unprocessed_honors_limit() {
        let source = MemorySource::new()
            .with_video(metadata("aaaaaaaaaaa", "One"))
            .with_video(metadata("bbbbbbbbbbb", "Two"))
            .with_video(metadata("ccccccccccc", "Three"));
        let (store, _, enricher) = enricher(source, 0);
        for url in [A, B, C] {
            collect(&store, url);
        }

        let first = enricher.process_unprocessed(Some(2)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|o| o.is_success()));
        assert_eq!(store.list_unprocessed().unwrap().len(), 1);

        let rest = enricher.process_unprocessed(None).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert!(enricher.process_unprocessed(None).await.unwrap().is_empty());
    }
}
