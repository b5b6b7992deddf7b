//! Pre-flight checks before expensive operations.
//!
//! Validates that the extractor is available before starting operations
//! that would otherwise fail on every item.

use crate::config::Settings;
use crate::error::{HarvestError, Result};
use std::process::Command;

/// Check that the configured extractor runs before collecting or extracting.
pub fn check_extractor(settings: &Settings) -> Result<()> {
    check_tool(&settings.extractor.binary).map(|_| ())
}

/// Check that an external tool runs, returning its version line.
pub fn check_tool(name: &str) -> Result<String> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(HarvestError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(HarvestError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(HarvestError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
