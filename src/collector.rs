//! URL collection from channels and playlists.

use crate::error::Result;
use crate::source::{
    canonical_video_url, classify, parse_http_url, ItemError, ListedEntry, SourceType,
    VideoSource,
};
use crate::store::{NewVideoUrl, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Summary of one collection run.
///
/// `attempted == inserted + skipped + errors.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub source_type: SourceType,
    pub source_url: String,
    pub attempted: usize,
    pub inserted: usize,
    /// Already collected before this run.
    pub skipped: usize,
    pub errors: Vec<ItemError>,
}

impl CollectionResult {
    fn new(source_type: SourceType, source_url: &str) -> Self {
        Self {
            source_type,
            source_url: source_url.to_string(),
            attempted: 0,
            inserted: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }
}

/// Outcome of collecting one source in [`Collector::collect_many`].
#[derive(Debug)]
pub struct SourceOutcome {
    pub url: String,
    pub result: Result<CollectionResult>,
}

/// Enumerates channels and playlists into the record store.
pub struct Collector {
    store: Arc<Store>,
    source: Arc<dyn VideoSource>,
}

impl Collector {
    pub fn new(store: Arc<Store>, source: Arc<dyn VideoSource>) -> Self {
        Self { store, source }
    }

    /// Collect every video uploaded by a channel.
    #[instrument(skip(self))]
    pub async fn collect_from_channel(&self, channel_url: &str) -> Result<CollectionResult> {
        let channel_url = validate_source_url(channel_url)?;
        let entries = self.source.list_channel_videos(&channel_url).await?;
        Ok(self.record(SourceType::Channel, &channel_url, entries))
    }

    /// Collect every video of a playlist.
    #[instrument(skip(self))]
    pub async fn collect_from_playlist(&self, playlist_url: &str) -> Result<CollectionResult> {
        let playlist_url = validate_source_url(playlist_url)?;
        let entries = self.source.list_playlist_videos(&playlist_url).await?;
        Ok(self.record(SourceType::Playlist, &playlist_url, entries))
    }

    /// Classify the URL and collect it as a channel or a playlist.
    #[instrument(skip(self))]
    pub async fn auto_collect(&self, url: &str) -> Result<CollectionResult> {
        let url = validate_source_url(url)?;
        match classify(&url)? {
            SourceType::Channel => self.collect_from_channel(&url).await,
            SourceType::Playlist => self.collect_from_playlist(&url).await,
        }
    }

    /// Auto-collect several sources, one after another.
    pub async fn collect_many(&self, urls: &[String]) -> Vec<SourceOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            let result = self.auto_collect(url).await;
            if let Err(e) = &result {
                warn!("Failed to collect {}: {}", url, e);
            }
            outcomes.push(SourceOutcome {
                url: url.clone(),
                result,
            });
        }

        outcomes
    }

    fn record(
        &self,
        source_type: SourceType,
        source_url: &str,
        entries: Vec<ListedEntry>,
    ) -> CollectionResult {
        let mut result = CollectionResult::new(source_type, source_url);

        for entry in entries {
            result.attempted += 1;

            let video = match entry {
                Ok(video) => video,
                Err(item) => {
                    result.errors.push(item);
                    continue;
                }
            };

            let url = match canonical_video_url(&video.url) {
                Ok(url) => url,
                Err(e) => {
                    result.errors.push(ItemError::new(&video.url, e.to_string()));
                    continue;
                }
            };

            let record = NewVideoUrl {
                url,
                title: video.title,
                channel_name: video.channel_name.unwrap_or_default(),
                source_type,
                source_url: source_url.to_string(),
            };

            match self.store.upsert_url(&record) {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    warn!("Failed to store {}: {}", record.url, e);
                    result.errors.push(ItemError::new(&record.url, e.to_string()));
                }
            }
        }

        info!(
            "Collected {} from {}: {} new, {} existing, {} failed",
            source_type,
            source_url,
            result.inserted,
            result.skipped,
            result.errors.len()
        );

        result
    }
}

fn validate_source_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    parse_http_url(trimmed)?;
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ListedVideo, MemorySource};
    use crate::store::UrlFilter;

    const CHANNEL: &str = "https://www.youtube.com/@PyConKRtube";
    const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLpycon2024";

    fn video(id: &str) -> ListedEntry {
        let mut listed = ListedVideo::new(
            format!("https://www.youtube.com/watch?v={}", id),
            format!("Talk {}", id),
        );
        listed.channel_name = Some("PyCon Korea".to_string());
        Ok(listed)
    }

    fn collector(source: MemorySource) -> (Arc<Store>, Collector) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let collector = Collector::new(store.clone(), Arc::new(source));
        (store, collector)
    }

    #[tokio::test]
    async fn test_collect_playlist_counts_add_up() {
        let source = MemorySource::new().with_playlist(
            PLAYLIST,
            vec![
                video("aaaaaaaaaaa"),
                Err(ItemError::new("entry 2", "Title unavailable")),
                video("bbbbbbbbbbb"),
                video("aaaaaaaaaaa"),
                Ok(ListedVideo::new("not a video", "Broken")),
            ],
        );
        let (store, collector) = collector(source);

        let result = collector.collect_from_playlist(PLAYLIST).await.unwrap();
        assert_eq!(result.source_type, SourceType::Playlist);
        assert_eq!(result.attempted, 5);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(
            result.attempted,
            result.inserted + result.skipped + result.errors.len()
        );

        let rows = store.list_urls(&UrlFilter::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.source_url == PLAYLIST));
        assert!(rows.iter().all(|r| r.channel_name == "PyCon Korea"));
    }

    #[tokio::test]
    async fn test_recollect_is_idempotent() {
        let source = MemorySource::new()
            .with_channel(CHANNEL, vec![video("aaaaaaaaaaa"), video("bbbbbbbbbbb")]);
        let (_, collector) = collector(source);

        let first = collector.collect_from_channel(CHANNEL).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = collector.collect_from_channel(CHANNEL).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
    }

    #[tokio::test]
    async fn test_auto_collect_dispatches() {
        let source = MemorySource::new()
            .with_channel(CHANNEL, vec![video("aaaaaaaaaaa")])
            .with_playlist(PLAYLIST, vec![video("bbbbbbbbbbb")]);
        let (_, collector) = collector(source);

        let channel = collector.auto_collect(CHANNEL).await.unwrap();
        assert_eq!(channel.source_type, SourceType::Channel);

        let playlist = collector.auto_collect(PLAYLIST).await.unwrap();
        assert_eq!(playlist.source_type, SourceType::Playlist);

        let err = collector
            .auto_collect("https://www.youtube.com/watch?v=aaaaaaaaaaa")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "classification");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_listing() {
        let (_, collector) = collector(MemorySource::new());

        for bad in ["", "   ", "ftp://example.com/list", "not a url"] {
            let err = collector.collect_from_channel(bad).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_input", "input {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_unlistable_source_fails_call() {
        let (_, collector) = collector(MemorySource::new());
        let err = collector.collect_from_playlist(PLAYLIST).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_collect_many_reports_each_source() {
        let source = MemorySource::new().with_channel(CHANNEL, vec![video("aaaaaaaaaaa")]);
        let (_, collector) = collector(source);

        let outcomes = collector
            .collect_many(&[CHANNEL.to_string(), PLAYLIST.to_string()])
            .await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result.as_ref().unwrap().inserted, 1);
        assert!(outcomes[1].result.is_err());
    }
}
