// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dashboard command - statistics and summary

use super::Context;
use anyhow::Result;
use prd_tracker::render::{self, Statistics};
use prd_tracker::{issues, pipeline};
use std::path::PathBuf;

/// Run the dashboard command
pub fn run(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let issues = issues::collect(&ctx.config.github);
    let report = pipeline::run(&ctx.config, &issues)?;

    let out = ctx.output_dir(output)?;
    ctx.write_json(&out, "statistics.json", &Statistics::from_report(&report))?;
    ctx.write_text(&out, "dashboard_summary.md", &render::dashboard(&report, &issues))?;

    let ui = &ctx.ui;
    ui.line(ui.heading("Dashboard"));
    ui.line(format!("  modules:   {}", report.modules.len()));
    ui.line(format!("  documents: {}", report.totals.total));
    ui.line(format!("  completed: {}", report.totals.completed));
    ui.line(format!("  progress:  {}", ui.percent(report.overall_progress)));
    ui.line(format!("  issues:    {} open [{}]", issues.open_issues, ui.source(&issues.source)));
    Ok(())
}
