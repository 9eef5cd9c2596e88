// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod code;
pub mod completions;
pub mod config;
pub mod consistency;
pub mod dashboard;
pub mod issues;
pub mod matrix;
pub mod modules;
pub mod report;
pub mod scan;
pub mod validate;

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use prd_tracker::config::Config;
use prd_tracker::render;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Terminal output settings
#[derive(Debug, Clone, Copy)]
pub struct Ui {
    /// Emit ANSI colors
    pub color: bool,
    /// Suppress summaries
    pub quiet: bool,
}

impl Ui {
    /// Print a summary line unless quiet
    pub fn line(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }

    /// Section heading
    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Percentage colored by band
    pub fn percent(&self, value: f64) -> String {
        let text = format!("{value:.1}%");
        if !self.color {
            text
        } else if value >= 80.0 {
            text.green().to_string()
        } else if value >= 50.0 {
            text.yellow().to_string()
        } else {
            text.red().to_string()
        }
    }

    /// Label for a data source; mock data is highlighted
    pub fn source(&self, source: &str) -> String {
        if self.color && source == "mock" {
            source.yellow().to_string()
        } else {
            source.to_string()
        }
    }

    /// Green when `good`, red otherwise
    pub fn verdict(&self, text: &str, good: bool) -> String {
        match (self.color, good) {
            (false, _) => text.to_string(),
            (true, true) => text.green().to_string(),
            (true, false) => text.red().to_string(),
        }
    }

    /// Path of a written artifact
    pub fn wrote(&self, path: &Path) {
        let shown = path.display().to_string();
        if self.color {
            self.line(format!("  {} {}", "wrote".dimmed(), shown));
        } else {
            self.line(format!("  wrote {shown}"));
        }
    }
}

/// Loaded configuration plus terminal settings
pub struct Context {
    /// Effective configuration
    pub config: Config,
    /// Terminal output
    pub ui: Ui,
}

impl Context {
    pub fn new(config: Config, color: bool, quiet: bool) -> Self {
        Self { config, ui: Ui { color, quiet } }
    }

    /// Output directory from the flag or configuration, created if missing
    pub fn output_dir(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        let dir = flag.map_or_else(|| self.config.output_path(), |p| self.config.resolve(&p));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(dir)
    }

    /// Resolve an optional path flag against the root
    pub fn path_or(&self, flag: Option<PathBuf>, default: PathBuf) -> PathBuf {
        flag.map_or(default, |p| self.config.resolve(&p))
    }

    /// Write pretty JSON into the output directory
    pub fn write_json<T: Serialize>(&self, dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
        self.write_text(dir, name, &render::to_json(value)?)
    }

    /// Write text into the output directory
    pub fn write_text(&self, dir: &Path, name: &str, text: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        self.ui.wrote(&path);
        Ok(path)
    }
}

/// Replace one marker region of the tracking document, creating it if needed
pub fn patch_document(path: &Path, begin: &str, end: &str, body: &str) -> Result<()> {
    let doc = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };
    let patched = render::patch_region(&doc, begin, end, body)
        .with_context(|| format!("Failed to patch {}", path.display()))?;

    if patched == doc {
        info!("{} already up to date", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, patched).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Patched {}", path.display());
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use prd_tracker::schema::{MATRIX_BEGIN, MATRIX_END};
    use tempfile::TempDir;

    #[test]
    fn plain_ui_has_no_escapes() {
        let ui = Ui { color: false, quiet: true };
        assert_eq!(ui.percent(85.0), "85.0%");
        assert_eq!(ui.heading("Summary"), "Summary");
        assert_eq!(ui.source("mock"), "mock");
    }

    #[test]
    fn colored_percent_has_escapes() {
        let ui = Ui { color: true, quiet: true };
        assert!(ui.percent(10.0).contains('\u{1b}'));
    }

    #[test]
    fn patch_document_creates_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("docs/tracking.md");
        patch_document(&doc, MATRIX_BEGIN, MATRIX_END, "| a |").unwrap();
        let first = fs::read_to_string(&doc).unwrap();
        patch_document(&doc, MATRIX_BEGIN, MATRIX_END, "| a |").unwrap();
        assert_eq!(fs::read_to_string(&doc).unwrap(), first);
        assert!(first.contains("| a |"));
    }
}
