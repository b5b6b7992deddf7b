//! Record store for collected URLs and extracted video details.
//!
//! Two tables: `video_urls` (one row per discovered video, insert-if-absent)
//! and `video_details` (at most one row per collected URL, overwritten on
//! re-extraction).

mod sqlite;

pub use sqlite::Store;

use crate::source::SourceType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default row limit for URL listings.
pub const DEFAULT_URL_LIMIT: usize = 100;

/// Default row limit for detail listings.
pub const DEFAULT_DETAIL_LIMIT: usize = 20;

/// A URL about to be recorded by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideoUrl {
    pub url: String,
    pub title: String,
    pub channel_name: String,
    pub source_type: SourceType,
    pub source_url: String,
}

/// A row of `video_urls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoUrlRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub channel_name: String,
    pub source_type: SourceType,
    pub source_url: String,
    pub collected_at: DateTime<Utc>,
}

/// Extracted details for one collected video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    /// Must match an existing `video_urls.url`.
    pub video_url: String,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_name: Option<String>,
    pub upload_date: Option<NaiveDate>,
    pub duration_seconds: Option<i64>,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub conference_name: Option<String>,
    pub conference_year: Option<i32>,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// A row of `video_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVideoDetails {
    pub id: i64,
    /// When this row was last written.
    pub extracted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: VideoDetails,
}

/// Filter for [`Store::list_urls`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlFilter {
    pub source_type: Option<SourceType>,
    pub channel_name: Option<String>,
    pub source_url: Option<String>,
    /// Defaults to [`DEFAULT_URL_LIMIT`].
    pub limit: Option<usize>,
}

/// Filter for [`Store::list_details`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFilter {
    /// Exact match.
    pub video_url: Option<String>,
    /// Case-insensitive substring match.
    pub conference_name: Option<String>,
    pub conference_year: Option<i32>,
    /// Defaults to [`DEFAULT_DETAIL_LIMIT`].
    pub limit: Option<usize>,
}

/// Aggregates for one (conference, year) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceStat {
    pub conference_name: String,
    pub conference_year: Option<i32>,
    pub video_count: i64,
    pub avg_views: Option<f64>,
    pub total_duration_seconds: i64,
}

/// Aggregates over every detail row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_videos: i64,
    pub unique_conferences: i64,
    pub unique_years: i64,
    pub avg_views: Option<f64>,
    pub total_duration_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferenceStatistics {
    pub overall: OverallStats,
    /// Newest year first, then by video count.
    pub conferences: Vec<ConferenceStat>,
}

/// A label with a row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Progress of the collection and enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStatistics {
    pub collected_urls: i64,
    pub detailed: i64,
    pub unprocessed: i64,
    pub by_source_type: Vec<LabelCount>,
    /// At most five channels, largest first.
    pub top_channels: Vec<LabelCount>,
}
