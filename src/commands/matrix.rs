// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Matrix command - full pipeline, tracking report and document patch

use super::{patch_document, Context};
use anyhow::Result;
use prd_tracker::schema::{MATRIX_BEGIN, MATRIX_END, STATS_BEGIN, STATS_END};
use prd_tracker::{issues, pipeline, render};
use std::path::PathBuf;
use tracing::info;

/// Run the matrix command
pub fn run(ctx: &Context, document: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let issues = issues::collect(&ctx.config.github);
    let report = pipeline::run(&ctx.config, &issues)?;

    let out = ctx.output_dir(output)?;
    ctx.write_json(&out, "tracking_report.json", &report)?;

    let doc = ctx.path_or(document, ctx.config.tracking_document_path());
    patch_document(&doc, MATRIX_BEGIN, MATRIX_END, &render::matrix(&report))?;
    patch_document(&doc, STATS_BEGIN, STATS_END, &render::stats(&report))?;
    info!("Tracking document {} matrix {}", doc.display(), report.matrix_digest);

    let ui = &ctx.ui;
    ui.line(ui.heading("Traceability matrix"));
    for module in &report.modules {
        ui.line(format!(
            "  {:<24} {:>3} docs  {}",
            module.dir,
            module.counts.total,
            ui.percent(module.progress)
        ));
    }
    ui.line(format!("  overall progress: {}", ui.percent(report.overall_progress)));
    ui.line(format!("  average score:    {:.1}/100", report.average_score));
    ui.line(format!("  issues:           {}", ui.source(&report.issue_source)));
    ui.line(format!("  patched {}", doc.display()));
    Ok(())
}
