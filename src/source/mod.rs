//! Video source abstraction for yt-harvest.
//!
//! Provides a trait-based interface over the video-platform extraction tool:
//! enumerating channels and playlists, and fetching per-video metadata.

mod memory;
mod url;
mod youtube;

pub use memory::{MemorySource, ScriptedFailure};
pub use url::{canonical_video_url, classify, extract_video_id, parse_http_url, watch_url};
pub use youtube::YtDlpSource;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a video URL was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Channel,
    Playlist,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Channel => "channel",
            SourceType::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "channel" => Ok(SourceType::Channel),
            "playlist" => Ok(SourceType::Playlist),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

/// A video discovered while enumerating a channel or playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedVideo {
    /// Canonical watch URL.
    pub url: String,
    /// Title as reported by the listing.
    pub title: String,
    /// Uploading channel, when the listing reports one.
    pub channel_name: Option<String>,
}

impl ListedVideo {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            channel_name: None,
        }
    }
}

/// A listing member that could not be turned into a [`ListedVideo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    /// URL, video id, or position of the offending entry.
    pub reference: String,
    pub message: String,
}

impl ItemError {
    pub fn new(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            message: message.into(),
        }
    }
}

/// One member of a channel or playlist listing.
pub type ListedEntry = std::result::Result<ListedVideo, ItemError>;

/// Extended metadata for a single video.
///
/// Counters the platform does not report are `None` rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_name: Option<String>,
    pub upload_date: Option<NaiveDate>,
    pub duration_seconds: Option<i64>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// Trait for video platform sources.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Enumerate the videos uploaded by a channel.
    ///
    /// Fails as a whole only when the channel itself cannot be listed;
    /// problems with individual members are reported per entry.
    async fn list_channel_videos(&self, channel_url: &str) -> Result<Vec<ListedEntry>>;

    /// Enumerate the videos of a playlist.
    async fn list_playlist_videos(&self, playlist_url: &str) -> Result<Vec<ListedEntry>>;

    /// Fetch extended metadata for one video.
    async fn fetch_video_metadata(&self, video_url: &str) -> Result<VideoMetadata>;
}
