//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::check_tool;
use crate::cli::Output;
use crate::config::Settings;
use crate::store::Store;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("yt-harvest Doctor");
    println!();

    let sections = [
        ("External Tools", vec![check_extractor(&settings.extractor.binary)]),
        ("Storage", check_storage(settings)),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    let mut errors = 0;
    let mut warnings = 0;

    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
            match check.status {
                CheckStatus::Error => errors += 1,
                CheckStatus::Warning => warnings += 1,
                CheckStatus::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        anyhow::bail!("{} error(s) found. Please fix them before using yt-harvest.", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! yt-harvest is ready to use.");
    }

    Ok(())
}

fn check_extractor(binary: &str) -> CheckResult {
    match check_tool(binary) {
        Ok(version) => CheckResult::ok(binary, &truncate(&version, 50)),
        Err(e) => CheckResult::error(binary, &e.to_string(), install_hint_ytdlp()),
    }
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let db_path = settings.database_path();
    if !db_path.exists() {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first collection",
        ));
        return results;
    }

    let opened = Store::open(&db_path).and_then(|store| {
        let stats = store.collection_statistics()?;
        store.close()?;
        Ok(stats)
    });

    match opened {
        Ok(stats) => results.push(CheckResult::ok(
            "Database",
            &format!(
                "{} ({} URLs, {} with details)",
                db_path.display(),
                stats.collected_urls,
                stats.detailed
            ),
        )),
        Err(e) => results.push(CheckResult::error(
            "Database",
            &format!("{}: {}", db_path.display(), e),
            "Move the file aside to start with a fresh database",
        )),
    }

    results
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: yt-harvest config init",
        )
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
