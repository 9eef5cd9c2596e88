// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Consistency command - every requirement should be named by a test

use super::Context;
use anyhow::Result;
use prd_tracker::consistency;
use prd_tracker::{pipeline, render};
use std::path::PathBuf;
use tracing::warn;

/// Run the consistency command
pub fn run(ctx: &Context, dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let tests = ctx.path_or(dir, ctx.config.tests_path());
    if !tests.is_dir() {
        warn!("Tests directory {} does not exist", tests.display());
    }

    let fr_ids = pipeline::scan(&ctx.config)?.fr_ids();
    let report = consistency::check_dir(&fr_ids, &tests);

    let out = ctx.output_dir(output)?;
    ctx.write_json(&out, "validation_report.json", &report)?;
    ctx.write_text(&out, "validation_report.md", &render::consistency(&report))?;

    let ui = &ctx.ui;
    ui.line(ui.heading("Requirement/test consistency"));
    ui.line(format!("  requirements: {}", report.total_fr_ids));
    ui.line(format!("  tested:       {}", report.tested_fr_ids));
    ui.line(format!(
        "  coverage:     {} {}",
        ui.percent(report.coverage_percentage),
        report.rating.label()
    ));
    if !report.untested_fr_ids.is_empty() {
        ui.line(format!("  untested:     {}", report.untested_fr_ids.join(", ")));
    }
    Ok(())
}
