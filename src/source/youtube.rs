//! YouTube source implementation backed by yt-dlp.

use super::url::{extract_video_id, parse_http_url, watch_url};
use super::{ItemError, ListedEntry, ListedVideo, SourceType, VideoMetadata, VideoSource};
use crate::config::ExtractorSettings;
use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Channel tabs yt-dlp can enumerate directly.
const CHANNEL_TABS: &[&str] = &["videos", "streams", "shorts", "live", "playlists", "featured"];

/// Titles yt-dlp reports for listing members whose metadata is hidden.
const PLACEHOLDER_TITLES: &[&str] = &["[Private video]", "[Deleted video]", "[Unavailable video]"];

/// stderr fragments meaning the target does not exist or cannot be accessed.
const NOT_FOUND_MARKERS: &[&str] = &[
    "video unavailable",
    "private video",
    "this video has been removed",
    "does not exist",
    "http error 404",
    "has been terminated",
    "is not available",
];

/// YouTube source that shells out to yt-dlp.
pub struct YtDlpSource {
    binary: String,
    timeout: Duration,
    playlist_end: Option<usize>,
}

impl YtDlpSource {
    pub fn new(settings: &ExtractorSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
            playlist_end: settings.playlist_end,
        }
    }

    /// Run yt-dlp with the configured timeout.
    async fn run(&self, args: &[String]) -> Result<Output> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HarvestError::ToolNotFound(self.binary.clone()))
            }
            Ok(Err(e)) => Err(HarvestError::Extraction(format!(
                "Failed to run {}: {}",
                self.binary, e
            ))),
            Err(_) => Err(HarvestError::Extraction(format!(
                "{} timed out after {}s",
                self.binary,
                self.timeout.as_secs()
            ))),
        }
    }

    /// Enumerate a channel or playlist with `--flat-playlist`.
    async fn list(&self, source_url: &str, kind: SourceType) -> Result<Vec<ListedEntry>> {
        let target = listing_url(source_url, kind)?;
        info!("Listing {} {}", kind, target);

        let mut args = vec![
            "--flat-playlist".to_string(),
            "--dump-json".to_string(),
            "--no-warnings".to_string(),
            "--ignore-errors".to_string(),
        ];
        if let Some(end) = self.playlist_end {
            args.push("--playlist-end".to_string());
            args.push(end.to_string());
        }
        args.push(target.clone());

        let output = self.run(&args).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let entries = parse_listing(&stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if entries.is_empty() {
                return Err(classify_failure(&stderr, &target));
            }
            warn!(
                "yt-dlp exited with {} while listing {}, keeping {} entries",
                output.status,
                target,
                entries.len()
            );
        }

        debug!("Listed {} entries from {}", entries.len(), target);
        Ok(entries)
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new(&ExtractorSettings::default())
    }
}

#[async_trait]
impl VideoSource for YtDlpSource {
    #[instrument(skip(self))]
    async fn list_channel_videos(&self, channel_url: &str) -> Result<Vec<ListedEntry>> {
        self.list(channel_url, SourceType::Channel).await
    }

    #[instrument(skip(self))]
    async fn list_playlist_videos(&self, playlist_url: &str) -> Result<Vec<ListedEntry>> {
        self.list(playlist_url, SourceType::Playlist).await
    }

    #[instrument(skip(self))]
    async fn fetch_video_metadata(&self, video_url: &str) -> Result<VideoMetadata> {
        let args = [
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            video_url.to_string(),
        ];

        let output = self.run(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, video_url));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| HarvestError::Extraction(format!("yt-dlp printed nothing for {}", video_url)))?;

        let json: Value = serde_json::from_str(line).map_err(|e| {
            HarvestError::Extraction(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        parse_metadata(&json)
    }
}

/// URL handed to yt-dlp for a listing.
///
/// A bare channel URL resolves to its tab list rather than its uploads, so
/// channels without an explicit tab are pointed at `/videos`.
fn listing_url(source_url: &str, kind: SourceType) -> Result<String> {
    let mut url = parse_http_url(source_url)?;
    if kind == SourceType::Playlist {
        return Ok(url.to_string());
    }

    let last = url
        .path_segments()
        .and_then(|mut s| s.rfind(|p| !p.is_empty()))
        .unwrap_or_default()
        .to_string();

    if !CHANNEL_TABS.contains(&last.as_str()) {
        let path = format!("{}/videos", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }

    Ok(url.to_string())
}

/// Parse `--flat-playlist --dump-json` output, one JSON object per line.
fn parse_listing(stdout: &str) -> Vec<ListedEntry> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| match serde_json::from_str::<Value>(line) {
            Ok(json) => parse_listing_entry(&json, i + 1),
            Err(e) => Err(ItemError::new(
                format!("entry {}", i + 1),
                format!("Unparseable listing entry: {}", e),
            )),
        })
        .collect()
}

fn parse_listing_entry(json: &Value, position: usize) -> ListedEntry {
    let raw = json["id"].as_str().or_else(|| json["url"].as_str());
    let reference = raw
        .map(str::to_string)
        .unwrap_or_else(|| format!("entry {}", position));

    let video_id = raw
        .and_then(extract_video_id)
        .or_else(|| json["url"].as_str().and_then(extract_video_id))
        .ok_or_else(|| ItemError::new(&reference, "Not a video entry"))?;

    let title = json["title"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ItemError::new(watch_url(&video_id), "Title unavailable"))?;

    if PLACEHOLDER_TITLES.contains(&title) {
        return Err(ItemError::new(
            watch_url(&video_id),
            format!("Video is not accessible: {}", title),
        ));
    }

    let channel_name = ["channel", "uploader", "playlist_channel", "playlist_uploader"]
        .iter()
        .find_map(|key| json[*key].as_str())
        .map(str::to_string);

    Ok(ListedVideo {
        url: watch_url(&video_id),
        title: title.to_string(),
        channel_name,
    })
}

/// Shape a single-video yt-dlp payload into [`VideoMetadata`].
fn parse_metadata(json: &Value) -> Result<VideoMetadata> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| HarvestError::Extraction("Unexpected yt-dlp payload: missing id".to_string()))?;

    let title = json["title"].as_str().ok_or_else(|| {
        HarvestError::Extraction(format!("Unexpected yt-dlp payload for {}: missing title", id))
    })?;

    let upload_date = json["upload_date"]
        .as_str()
        .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y%m%d").ok());

    let tags = json["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(VideoMetadata {
        id: id.to_string(),
        title: title.to_string(),
        description: json["description"].as_str().unwrap_or_default().to_string(),
        channel_name: json["channel"]
            .as_str()
            .or_else(|| json["uploader"].as_str())
            .map(str::to_string),
        upload_date,
        duration_seconds: json["duration"].as_f64().map(|d| d.round() as i64),
        view_count: json["view_count"].as_i64(),
        like_count: json["like_count"].as_i64(),
        comment_count: json["comment_count"].as_i64(),
        tags,
        thumbnail_url: json["thumbnail"].as_str().map(str::to_string),
    })
}

/// Map a failed yt-dlp run to an error kind using its stderr.
fn classify_failure(stderr: &str, target: &str) -> HarvestError {
    let message = stderr
        .lines()
        .find(|l| l.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .trim();
    let message: String = message.chars().take(300).collect();

    let lower = message.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        HarvestError::NotFound(format!("{}: {}", target, message))
    } else if message.is_empty() {
        HarvestError::Extraction(format!("yt-dlp failed for {}", target))
    } else {
        HarvestError::Extraction(format!("{}: {}", target, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_url_appends_videos_tab() {
        assert_eq!(
            listing_url("https://www.youtube.com/@PyConKRtube", SourceType::Channel).unwrap(),
            "https://www.youtube.com/@PyConKRtube/videos"
        );
        assert_eq!(
            listing_url("https://www.youtube.com/@PyConKRtube/streams", SourceType::Channel).unwrap(),
            "https://www.youtube.com/@PyConKRtube/streams"
        );
        assert_eq!(
            listing_url("https://www.youtube.com/playlist?list=PL123", SourceType::Playlist).unwrap(),
            "https://www.youtube.com/playlist?list=PL123"
        );
    }

    #[test]
    fn test_parse_listing_mixed_entries() {
        let stdout = [
            json!({"id": "dQw4w9WgXcQ", "title": "PyCon KR 2024 키노트", "channel": "PyCon Korea"}).to_string(),
            String::new(),
            json!({"id": "aaaaaaaaaaa", "title": "[Private video]"}).to_string(),
            json!({"id": "bbbbbbbbbbb"}).to_string(),
            json!({"id": "UC26x6Ib8BJ9kbXMmCqmTHxg", "title": "Shorts"}).to_string(),
            "{not json".to_string(),
        ]
        .join("\n");

        let entries = parse_listing(&stdout);
        assert_eq!(entries.len(), 5);

        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(first.title, "PyCon KR 2024 키노트");
        assert_eq!(first.channel_name.as_deref(), Some("PyCon Korea"));

        assert!(entries[1].as_ref().unwrap_err().message.contains("not accessible"));
        assert_eq!(entries[2].as_ref().unwrap_err().message, "Title unavailable");
        assert_eq!(entries[3].as_ref().unwrap_err().message, "Not a video entry");
        assert_eq!(entries[4].as_ref().unwrap_err().reference, "entry 5");
    }

    #[test]
    fn test_parse_metadata_full() {
        let json = json!({
            "id": "dQw4w9WgXcQ",
            "title": "PyCon KR 2024 키노트",
            "description": "Opening keynote",
            "uploader": "PyCon Korea",
            "upload_date": "20241026",
            "duration": 1834.6,
            "view_count": 1520,
            "like_count": 33,
            "tags": ["python", "pycon"],
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        });

        let meta = parse_metadata(&json).unwrap();
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(meta.channel_name.as_deref(), Some("PyCon Korea"));
        assert_eq!(meta.upload_date, chrono::NaiveDate::from_ymd_opt(2024, 10, 26));
        assert_eq!(meta.duration_seconds, Some(1835));
        assert_eq!(meta.view_count, Some(1520));
        assert_eq!(meta.comment_count, None);
        assert_eq!(meta.tags, vec!["python", "pycon"]);
    }

    #[test]
    fn test_parse_metadata_partial() {
        let meta = parse_metadata(&json!({"id": "dQw4w9WgXcQ", "title": "Untitled talk"})).unwrap();
        assert_eq!(meta.description, "");
        assert_eq!(meta.view_count, None);
        assert_eq!(meta.duration_seconds, None);
        assert!(meta.tags.is_empty());

        let err = parse_metadata(&json!({"id": "dQw4w9WgXcQ"})).unwrap_err();
        assert!(matches!(err, HarvestError::Extraction(_)));
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure(
            "ERROR: [youtube] dQw4w9WgXcQ: Private video. Sign in if you've been granted access",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        );
        assert!(matches!(err, HarvestError::NotFound(_)));

        let err = classify_failure(
            "ERROR: Unable to download webpage: <urlopen error timed out>",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        );
        assert!(matches!(err, HarvestError::Extraction(_)));

        let err = classify_failure("", "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(err.is_transient());
    }

    /// Write an executable shell script standing in for yt-dlp.
    #[cfg(unix)]
    fn fake_extractor(dir: &std::path::Path, body: &str, timeout_seconds: u64) -> YtDlpSource {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        YtDlpSource::new(&ExtractorSettings {
            binary: path.to_string_lossy().to_string(),
            timeout_seconds,
            ..ExtractorSettings::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_extractor_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = fake_extractor(dir.path(), "sleep 10", 1);

        let started = std::time::Instant::now();
        let err = source
            .fetch_video_metadata("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "extraction");
        assert!(err.is_transient());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_listing_keeps_printed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let source = fake_extractor(
            dir.path(),
            "echo '{\"id\": \"dQw4w9WgXcQ\", \"title\": \"Keynote\"}'\n\
             echo 'ERROR: [youtube] aaaaaaaaaaa: Video unavailable' >&2\n\
             exit 1",
            10,
        );

        let entries = source
            .list_playlist_videos("https://www.youtube.com/playlist?list=PL123")
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].as_ref().unwrap().url,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_listing_without_entries_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = fake_extractor(
            dir.path(),
            "echo 'ERROR: [youtube:tab] PLmissing: This playlist does not exist' >&2\nexit 1",
            10,
        );

        let err = source
            .list_playlist_videos("https://www.youtube.com/playlist?list=PLmissing")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let source = YtDlpSource::new(&ExtractorSettings {
            binary: "yt-dlp-definitely-not-installed".to_string(),
            ..ExtractorSettings::default()
        });

        let err = source
            .fetch_video_metadata("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::ToolNotFound(_)));
    }
}
