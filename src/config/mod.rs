//! Configuration module for yt-harvest.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    DatabaseSettings, ExtractorSettings, GeneralSettings, ServerSettings, Settings, ToolProfile,
};
