//! MCP tool definitions for yt-harvest.

use super::protocol::Tool;
use crate::config::ToolProfile;
use serde_json::json;

pub const COLLECT_CHANNEL: &str = "collect_channel_videos";
pub const COLLECT_PLAYLIST: &str = "collect_playlist_videos";
pub const AUTO_COLLECT: &str = "auto_collect_videos";
pub const GET_COLLECTED: &str = "get_collected_videos";
pub const EXTRACT_DETAILS: &str = "extract_video_details";
pub const BATCH_EXTRACT: &str = "batch_extract_details";
pub const PROCESS_UNPROCESSED: &str = "process_unprocessed_videos";
pub const GET_DETAILS: &str = "get_video_details";
pub const CONFERENCE_STATISTICS: &str = "get_conference_statistics";

/// Tools exposed under the given profile.
pub fn get_tools(profile: ToolProfile) -> Vec<Tool> {
    match profile {
        ToolProfile::Collector => collector_tools(),
        ToolProfile::Details => detail_tools(),
        ToolProfile::All => {
            let mut tools = collector_tools();
            tools.extend(detail_tools());
            tools
        }
    }
}

/// Whether `name` is callable under the given profile.
pub fn is_exposed(profile: ToolProfile, name: &str) -> bool {
    get_tools(profile).iter().any(|t| t.name == name)
}

fn collector_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: COLLECT_CHANNEL.to_string(),
            description: "Collect every video URL uploaded by a YouTube channel and store the \
                new ones. Returns counts of inserted, already-known and failed entries."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "channel_url": {
                        "type": "string",
                        "description": "Channel URL, e.g. https://www.youtube.com/@PyConKRtube"
                    }
                },
                "required": ["channel_url"]
            }),
        },
        Tool {
            name: COLLECT_PLAYLIST.to_string(),
            description: "Collect every video URL in a YouTube playlist and store the new ones."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "playlist_url": {
                        "type": "string",
                        "description": "Playlist URL containing a list= parameter"
                    }
                },
                "required": ["playlist_url"]
            }),
        },
        Tool {
            name: AUTO_COLLECT.to_string(),
            description: "Detect whether a URL is a channel or a playlist and collect it."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Channel or playlist URL"
                    }
                },
                "required": ["url"]
            }),
        },
        Tool {
            name: GET_COLLECTED.to_string(),
            description: "List collected video URLs, newest first.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of rows",
                        "minimum": 1,
                        "default": 100
                    },
                    "source_type": {
                        "type": "string",
                        "enum": ["channel", "playlist"],
                        "description": "Only URLs discovered through this kind of source"
                    },
                    "channel_name": {
                        "type": "string",
                        "description": "Exact channel name"
                    },
                    "source_url": {
                        "type": "string",
                        "description": "Exact channel or playlist URL the videos came from"
                    }
                },
                "required": []
            }),
        },
    ]
}

fn detail_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: EXTRACT_DETAILS.to_string(),
            description: "Fetch metadata (views, likes, duration, tags) for one collected video, \
                infer its conference, and store the details."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_url": {
                        "type": "string",
                        "description": "Watch URL, short link, or 11-character video ID"
                    }
                },
                "required": ["video_url"]
            }),
        },
        Tool {
            name: BATCH_EXTRACT.to_string(),
            description: "Extract details for several collected videos. Each URL succeeds or \
                fails independently."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_urls": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1,
                        "description": "Video URLs or IDs"
                    }
                },
                "required": ["video_urls"]
            }),
        },
        Tool {
            name: PROCESS_UNPROCESSED.to_string(),
            description: "Extract details for collected videos that have none yet, newest first."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of videos to process",
                        "minimum": 1,
                        "default": 10
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: GET_DETAILS.to_string(),
            description: "Query stored video details, most viewed first.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_url": {
                        "type": "string",
                        "description": "Exact video URL"
                    },
                    "conference_name": {
                        "type": "string",
                        "description": "Case-insensitive substring of the conference name"
                    },
                    "conference_year": {
                        "type": "integer",
                        "description": "Conference year"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of rows",
                        "minimum": 1,
                        "default": 20
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: CONFERENCE_STATISTICS.to_string(),
            description: "Video counts, average views and total duration per conference and year."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_tool_counts() {
        assert_eq!(get_tools(ToolProfile::Collector).len(), 4);
        assert_eq!(get_tools(ToolProfile::Details).len(), 5);
        assert_eq!(get_tools(ToolProfile::All).len(), 9);
    }

    #[test]
    fn test_exposure_follows_profile() {
        assert!(is_exposed(ToolProfile::Collector, AUTO_COLLECT));
        assert!(!is_exposed(ToolProfile::Collector, EXTRACT_DETAILS));
        assert!(is_exposed(ToolProfile::Details, CONFERENCE_STATISTICS));
        assert!(is_exposed(ToolProfile::All, GET_COLLECTED));
        assert!(!is_exposed(ToolProfile::All, "transcribe"));
    }
}
