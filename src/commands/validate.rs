// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validate command - checks PRD documents against the template
//!
//! Returns whether every document passed; the caller maps failure to exit 1.

use super::Context;
use crate::Format;
use anyhow::{bail, Context as _, Result};
use prd_tracker::render;
use prd_tracker::validate::{self, ValidationReport};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Run the validate command
pub fn run(
    ctx: &Context,
    dir: Option<PathBuf>,
    file: Option<PathBuf>,
    format: Format,
    save: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<bool> {
    let report = match file {
        Some(file) => {
            let path = ctx.config.resolve(&file);
            if !path.is_file() {
                bail!("File not found: {}", path.display());
            }
            info!("Validating {}", path.display());
            ValidationReport::from_files(vec![validate::validate_file(&path)])
        }
        None => {
            let prd = ctx.path_or(dir, ctx.config.prd_path());
            info!("Validating documents below {}", prd.display());
            if !prd.is_dir() {
                warn!("PRD directory {} does not exist", prd.display());
            }
            validate::validate_dir(&prd)
        }
    };

    let text = match format {
        Format::Markdown => render::validation(&report),
        Format::Json => render::to_json(&report)?,
    };

    match save {
        Some(name) => {
            let path = ctx.output_dir(output)?.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&path, &text).with_context(|| format!("Failed to write {}", path.display()))?;
            ctx.ui.wrote(&path);
            summarize(ctx, &report);
        }
        None => print!("{text}"),
    }

    Ok(!report.has_failures())
}

fn summarize(ctx: &Context, report: &ValidationReport) {
    let ui = &ctx.ui;
    let s = &report.summary;
    ui.line(ui.heading("PRD validation"));
    ui.line(format!("  documents: {}", s.total_files));
    ui.line(format!("  passed:    {}", ui.verdict(&s.passed_files.to_string(), true)));
    ui.line(format!(
        "  failed:    {}",
        ui.verdict(&s.failed_files.to_string(), s.failed_files == 0)
    ));
    ui.line(format!("  average:   {:.1}/100", s.average_score));
}
