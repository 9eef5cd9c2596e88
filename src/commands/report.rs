// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Report command - daily quality report and weekly summary

use super::Context;
use anyhow::{Context as _, Result};
use chrono::Local;
use prd_tracker::render;
use prd_tracker::validate;
use std::fs;
use std::path::{Path, PathBuf};

/// Run the report command
pub fn run(ctx: &Context, weekly: bool, dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let out = ctx.output_dir(output)?;
    let today = Local::now().date_naive();

    if weekly {
        let dailies = daily_reports(&out)?;
        let text = render::weekly_report(&dailies, today);
        ctx.write_text(&out, &render::weekly_report_name(today), &text)?;
        ctx.ui.line(format!("  daily reports found: {}", dailies.len()));
        return Ok(());
    }

    let prd = ctx.path_or(dir, ctx.config.prd_path());
    let report = validate::validate_dir(&prd);
    let text = render::daily_report(&report, today);
    ctx.write_text(&out, &render::daily_report_name(today), &text)?;
    ctx.write_text(&out, "latest_report.md", &text)?;

    let ui = &ctx.ui;
    let s = &report.summary;
    ui.line(ui.heading("Daily quality report"));
    ui.line(format!("  checked: {}", s.total_files));
    ui.line(format!(
        "  passed:  {}",
        ui.verdict(&s.passed_files.to_string(), s.failed_files == 0)
    ));
    ui.line(format!("  average: {:.1}/100", s.average_score));
    Ok(())
}

/// Daily report files in the output directory
fn daily_reports(out: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let entries = fs::read_dir(out).with_context(|| format!("Failed to list {}", out.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_daily = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with("daily_report_"));
        if is_daily && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
