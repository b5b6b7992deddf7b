//! Configuration settings for yt-harvest.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub database: DatabaseSettings,
    pub extractor: ExtractorSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.yt-harvest".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.yt-harvest/videos.db".to_string(),
        }
    }
}

/// Settings for the external metadata extractor (yt-dlp).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Executable name or path of yt-dlp.
    pub binary: String,
    /// Upper bound for a single yt-dlp invocation, in seconds.
    pub timeout_seconds: u64,
    /// Extra attempts after a transient extraction failure.
    pub max_retries: usize,
    /// Backoff unit in milliseconds. Delays grow as 2x, 4x, 8x this value.
    pub retry_delay_ms: u64,
    /// Stop listing a channel or playlist after this many entries.
    pub playlist_end: Option<usize>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            timeout_seconds: 120,
            max_retries: 2,
            retry_delay_ms: 500,
            playlist_end: None,
        }
    }
}

/// Which group of tools the MCP server exposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolProfile {
    /// URL collection tools only.
    Collector,
    /// Detail extraction and query tools only.
    Details,
    /// Everything.
    #[default]
    All,
}

impl std::str::FromStr for ToolProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collector" | "urls" => Ok(ToolProfile::Collector),
            "details" | "detail" => Ok(ToolProfile::Details),
            "all" => Ok(ToolProfile::All),
            _ => Err(format!("Unknown tool profile: {}", s)),
        }
    }
}

impl std::fmt::Display for ToolProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolProfile::Collector => write!(f, "collector"),
            ToolProfile::Details => write!(f, "details"),
            ToolProfile::All => write!(f, "all"),
        }
    }
}

/// MCP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Tool profile used when none is given on the command line.
    pub profile: ToolProfile,
    /// Default row limit for `get_collected_videos`.
    pub collected_limit: usize,
    /// Default row limit for `get_video_details`.
    pub details_limit: usize,
    /// Default batch size for `process_unprocessed_videos`.
    pub process_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            profile: ToolProfile::All,
            collected_limit: 100,
            details_limit: 20,
            process_limit: 10,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::HarvestError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("yt-harvest")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded database path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }
}
