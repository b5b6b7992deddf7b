//! URL validation and classification.

use super::SourceType;
use crate::error::{HarvestError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^
            (?:https?://)?
            (?:www\.|m\.)?
            (?:
                youtube\.com/(?:watch\?(?:[^\#]*&)?v=|embed/|v/|shorts/|live/)
                |
                youtu\.be/
            )
            ([a-zA-Z0-9_-]{11})
            (?:[?&/\#].*)?
            $
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Parse an absolute http(s) URL, rejecting empty or malformed input.
pub fn parse_http_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(HarvestError::InvalidInput("URL must not be empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| HarvestError::InvalidInput(format!("Malformed URL '{}': {}", trimmed, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {}",
            url.scheme(),
            trimmed
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(HarvestError::InvalidInput(format!("URL has no host: {}", trimmed)));
    }

    Ok(url)
}

/// Decide whether a URL points at a playlist or a channel.
///
/// A `list` query parameter or a `/playlist` path wins over any channel-looking
/// path, so `watch?v=...&list=...` is treated as its playlist.
pub fn classify(input: &str) -> Result<SourceType> {
    let url = parse_http_url(input)?;

    let has_list_param = url.query_pairs().any(|(k, v)| k == "list" && !v.is_empty());
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if has_list_param || segments.first().copied() == Some("playlist") {
        return Ok(SourceType::Playlist);
    }

    match segments.first().copied() {
        Some("channel" | "c" | "user") if segments.len() > 1 => Ok(SourceType::Channel),
        Some(first) if first.len() > 1 && first.starts_with('@') => Ok(SourceType::Channel),
        _ => Err(HarvestError::Classification(format!(
            "{} is neither a channel nor a playlist URL",
            input.trim()
        ))),
    }
}

/// Extract an 11-character video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Validate a video reference and return its canonical watch URL.
pub fn canonical_video_url(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(HarvestError::InvalidInput("Video URL must not be empty".to_string()));
    }

    extract_video_id(trimmed)
        .map(|id| watch_url(&id))
        .ok_or_else(|| {
            HarvestError::InvalidInput(format!("Not a YouTube video URL or ID: {}", trimmed))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_playlist() {
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PLZPhyNeJvHRldfheI6KcgektEiXAIPJaY")
                .unwrap(),
            SourceType::Playlist
        );
        assert_eq!(
            classify("https://www.youtube.com/watch?v=UWDRX4z4-k0&list=PLZPhyNeJvHRnSJ2sAnqCGFnVRKo98EgCp")
                .unwrap(),
            SourceType::Playlist
        );
    }

    #[test]
    fn test_classify_channel() {
        assert_eq!(classify("https://www.youtube.com/@PyConKRtube").unwrap(), SourceType::Channel);
        assert_eq!(
            classify("https://www.youtube.com/channel/UC26x6Ib8BJ9kbXMmCqmTHxg").unwrap(),
            SourceType::Channel
        );
        assert_eq!(classify("https://youtube.com/c/PyConKorea/videos").unwrap(), SourceType::Channel);
        assert_eq!(classify("https://youtube.com/user/pyconkr").unwrap(), SourceType::Channel);
    }

    #[test]
    fn test_classify_rejects_ambiguous() {
        let err = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap_err();
        assert!(matches!(err, HarvestError::Classification(_)));

        let err = classify("https://www.youtube.com/@").unwrap_err();
        assert!(matches!(err, HarvestError::Classification(_)));
    }

    #[test]
    fn test_classify_rejects_malformed() {
        assert!(matches!(classify("").unwrap_err(), HarvestError::InvalidInput(_)));
        assert!(matches!(classify("not a url").unwrap_err(), HarvestError::InvalidInput(_)));
        assert!(matches!(
            classify("ftp://youtube.com/@x").unwrap_err(),
            HarvestError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10s"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));

        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_canonical_video_url() {
        assert_eq!(
            canonical_video_url(" https://youtu.be/dQw4w9WgXcQ ").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert!(matches!(
            canonical_video_url("   ").unwrap_err(),
            HarvestError::InvalidInput(_)
        ));
        assert!(matches!(
            canonical_video_url("https://example.com/video").unwrap_err(),
            HarvestError::InvalidInput(_)
        ));
    }
}
