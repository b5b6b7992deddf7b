//! Typed tool arguments, validated before dispatch.

use crate::error::{HarvestError, Result};
use crate::source::{canonical_video_url, parse_http_url, SourceType};
use crate::store::{DetailFilter, UrlFilter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Argument record of a single tool.
pub trait ToolArgs: DeserializeOwned {
    /// Reject values that deserialize but cannot be acted on.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Deserialize and validate a tool's argument object.
///
/// Missing arguments are treated as an empty object.
pub fn parse<T: ToolArgs>(arguments: Option<Value>) -> Result<T> {
    let value = match arguments {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value @ Value::Object(_)) => value,
        Some(other) => {
            return Err(HarvestError::InvalidInput(format!(
                "Arguments must be an object, got {}",
                other
            )))
        }
    };

    let args: T = serde_json::from_value(value)
        .map_err(|e| HarvestError::InvalidInput(format!("Invalid arguments: {}", e)))?;
    args.validate()?;
    Ok(args)
}

fn require_url(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HarvestError::InvalidInput(format!("'{}' must not be empty", field)));
    }
    parse_http_url(value).map(|_| ())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HarvestError::InvalidInput(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

fn require_positive(field: &str, value: Option<usize>) -> Result<()> {
    if value == Some(0) {
        return Err(HarvestError::InvalidInput(format!("'{}' must be at least 1", field)));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CollectChannelArgs {
    pub channel_url: String,
}

impl ToolArgs for CollectChannelArgs {
    fn validate(&self) -> Result<()> {
        require_url("channel_url", &self.channel_url)
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectPlaylistArgs {
    pub playlist_url: String,
}

impl ToolArgs for CollectPlaylistArgs {
    fn validate(&self) -> Result<()> {
        require_url("playlist_url", &self.playlist_url)
    }
}

#[derive(Debug, Deserialize)]
pub struct AutoCollectArgs {
    pub url: String,
}

impl ToolArgs for AutoCollectArgs {
    fn validate(&self) -> Result<()> {
        require_url("url", &self.url)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetCollectedArgs {
    pub limit: Option<usize>,
    pub source_type: Option<SourceType>,
    pub channel_name: Option<String>,
    pub source_url: Option<String>,
}

impl ToolArgs for GetCollectedArgs {
    fn validate(&self) -> Result<()> {
        require_positive("limit", self.limit)
    }
}

impl GetCollectedArgs {
    pub fn into_filter(self, default_limit: usize) -> UrlFilter {
        UrlFilter {
            source_type: self.source_type,
            channel_name: self.channel_name,
            source_url: self.source_url,
            limit: Some(self.limit.unwrap_or(default_limit)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractDetailsArgs {
    #[serde(alias = "url")]
    pub video_url: String,
}

impl ToolArgs for ExtractDetailsArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("video_url", &self.video_url)
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchExtractArgs {
    #[serde(alias = "urls")]
    pub video_urls: Vec<String>,
}

impl ToolArgs for BatchExtractArgs {
    fn validate(&self) -> Result<()> {
        if self.video_urls.is_empty() {
            return Err(HarvestError::InvalidInput(
                "'video_urls' must contain at least one URL".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessUnprocessedArgs {
    pub limit: Option<usize>,
}

impl ToolArgs for ProcessUnprocessedArgs {
    fn validate(&self) -> Result<()> {
        require_positive("limit", self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GetDetailsArgs {
    #[serde(alias = "url")]
    pub video_url: Option<String>,
    pub conference_name: Option<String>,
    pub conference_year: Option<i32>,
    pub limit: Option<usize>,
}

impl ToolArgs for GetDetailsArgs {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.video_url {
            require_non_empty("video_url", url)?;
            canonical_video_url(url)?;
        }
        require_positive("limit", self.limit)
    }
}

impl GetDetailsArgs {
    /// Build the store filter, matching the URL in its canonical form.
    pub fn into_filter(self, default_limit: usize) -> Result<DetailFilter> {
        Ok(DetailFilter {
            video_url: self.video_url.as_deref().map(canonical_video_url).transpose()?,
            conference_name: self.conference_name,
            conference_year: self.conference_year,
            limit: Some(self.limit.unwrap_or(default_limit)),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NoArgs {}

impl ToolArgs for NoArgs {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_url_rejected() {
        let err = parse::<CollectChannelArgs>(Some(json!({"channel_url": "  "}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = parse::<AutoCollectArgs>(Some(json!({"url": "youtube"}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse::<CollectPlaylistArgs>(None).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_non_object_arguments() {
        let err = parse::<NoArgs>(Some(json!(["x"]))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = parse::<ProcessUnprocessedArgs>(Some(json!({"limit": 0}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let err = parse::<GetCollectedArgs>(Some(json!({"limit": -3}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_aliases_and_defaults() {
        let args = parse::<ExtractDetailsArgs>(Some(json!({"url": "dQw4w9WgXcQ"}))).unwrap();
        assert_eq!(args.video_url, "dQw4w9WgXcQ");

        let args = parse::<BatchExtractArgs>(Some(json!({"urls": ["a", "b"]}))).unwrap();
        assert_eq!(args.video_urls.len(), 2);

        let filter = parse::<GetDetailsArgs>(None).unwrap().into_filter(20).unwrap();
        assert_eq!(filter.limit, Some(20));

        let filter = parse::<GetDetailsArgs>(Some(json!({"url": "https://youtu.be/dQw4w9WgXcQ"})))
            .unwrap()
            .into_filter(20)
            .unwrap();
        assert_eq!(
            filter.video_url.as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_source_type_is_typed() {
        let args =
            parse::<GetCollectedArgs>(Some(json!({"source_type": "playlist"}))).unwrap();
        assert_eq!(args.source_type, Some(SourceType::Playlist));

        let err = parse::<GetCollectedArgs>(Some(json!({"source_type": "feed"}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = parse::<BatchExtractArgs>(Some(json!({"video_urls": []}))).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
