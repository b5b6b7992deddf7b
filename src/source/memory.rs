//! In-memory video source.
//!
//! Serves canned listings and metadata, with optional scripted failures.
//! Useful for testing the collection and enrichment pipeline without yt-dlp.

use super::url::canonical_video_url;
use super::{ListedEntry, VideoMetadata, VideoSource};
use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Failure to inject for a given video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// Always fail with `NotFound`.
    NotFound,
    /// Fail with a transient extraction error this many more times.
    Transient(usize),
}

/// In-memory video source.
#[derive(Default)]
pub struct MemorySource {
    channels: HashMap<String, Vec<ListedEntry>>,
    playlists: HashMap<String, Vec<ListedEntry>>,
    videos: HashMap<String, VideoMetadata>,
    failures: Mutex<HashMap<String, ScriptedFailure>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listing returned for a channel URL.
    pub fn with_channel(mut self, url: &str, entries: Vec<ListedEntry>) -> Self {
        self.channels.insert(url.to_string(), entries);
        self
    }

    /// Register the listing returned for a playlist URL.
    pub fn with_playlist(mut self, url: &str, entries: Vec<ListedEntry>) -> Self {
        self.playlists.insert(url.to_string(), entries);
        self
    }

    /// Register metadata, keyed by the video's canonical watch URL.
    pub fn with_video(mut self, metadata: VideoMetadata) -> Self {
        self.videos.insert(super::watch_url(&metadata.id), metadata);
        self
    }

    /// Make fetches of `video_url` fail.
    pub fn with_failure(self, video_url: &str, failure: ScriptedFailure) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(video_url.to_string(), failure);
        }
        self
    }

    /// How many times metadata for `video_url` has been requested.
    pub fn fetch_count(&self, video_url: &str) -> usize {
        self.fetches
            .lock()
            .map(|f| f.get(video_url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn lock_err<E: std::fmt::Display>(e: E) -> HarvestError {
        HarvestError::Extraction(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl VideoSource for MemorySource {
    async fn list_channel_videos(&self, channel_url: &str) -> Result<Vec<ListedEntry>> {
        self.channels
            .get(channel_url)
            .cloned()
            .ok_or_else(|| HarvestError::NotFound(format!("Channel not found: {}", channel_url)))
    }

    async fn list_playlist_videos(&self, playlist_url: &str) -> Result<Vec<ListedEntry>> {
        self.playlists
            .get(playlist_url)
            .cloned()
            .ok_or_else(|| HarvestError::NotFound(format!("Playlist not found: {}", playlist_url)))
    }

    async fn fetch_video_metadata(&self, video_url: &str) -> Result<VideoMetadata> {
        let key = canonical_video_url(video_url)?;

        *self
            .fetches
            .lock()
            .map_err(Self::lock_err)?
            .entry(key.clone())
            .or_insert(0) += 1;

        {
            let mut failures = self.failures.lock().map_err(Self::lock_err)?;
            match failures.get(&key).copied() {
                Some(ScriptedFailure::NotFound) => {
                    return Err(HarvestError::NotFound(format!("Video unavailable: {}", key)));
                }
                Some(ScriptedFailure::Transient(remaining)) if remaining > 0 => {
                    failures.insert(key.clone(), ScriptedFailure::Transient(remaining - 1));
                    return Err(HarvestError::Extraction(format!("Connection reset: {}", key)));
                }
                _ => {}
            }
        }

        self.videos
            .get(&key)
            .cloned()
            .ok_or_else(|| HarvestError::NotFound(format!("Video unavailable: {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ItemError, ListedVideo};

    const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_listing_lookup() {
        let source = MemorySource::new().with_playlist(
            "https://www.youtube.com/playlist?list=PL1",
            vec![
                Ok(ListedVideo::new(VIDEO, "Talk")),
                Err(ItemError::new("entry 2", "Title unavailable")),
            ],
        );

        let entries = source
            .list_playlist_videos("https://www.youtube.com/playlist?list=PL1")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let err = source
            .list_channel_videos("https://www.youtube.com/@nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transient_failures_run_out() {
        let source = MemorySource::new()
            .with_video(VideoMetadata {
                id: "dQw4w9WgXcQ".to_string(),
                title: "Talk".to_string(),
                ..Default::default()
            })
            .with_failure(VIDEO, ScriptedFailure::Transient(1));

        assert!(source.fetch_video_metadata(VIDEO).await.unwrap_err().is_transient());
        assert_eq!(source.fetch_video_metadata(VIDEO).await.unwrap().title, "Talk");
        assert_eq!(source.fetch_count(VIDEO), 2);
    }
}
