// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Modules command - go-live status of every registered module

use super::{patch_document, Context};
use anyhow::Result;
use chrono::{DateTime, Utc};
use prd_tracker::modules::{self, ModuleStatus, ModuleTotals};
use prd_tracker::schema::{MODULES_BEGIN, MODULES_END};
use prd_tracker::{issues, render};
use serde::Serialize;
use std::path::PathBuf;

/// `module_status.json`
#[derive(Serialize)]
struct ModuleStatusFile<'a> {
    generated_at: DateTime<Utc>,
    totals: ModuleTotals,
    modules: &'a [ModuleStatus],
}

/// Run the modules command
pub fn run(ctx: &Context, document: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let issues = issues::collect(&ctx.config.github);
    let statuses = modules::check_all(&ctx.config, &issues);
    let totals = ModuleTotals::from_statuses(&statuses);
    let generated_at = Utc::now();

    let out = ctx.output_dir(output)?;
    let file = ModuleStatusFile { generated_at, totals, modules: &statuses };
    ctx.write_json(&out, "module_status.json", &file)?;
    ctx.write_text(
        &out,
        "module_status_report.md",
        &render::module_report(&statuses, generated_at),
    )?;

    let doc = ctx.path_or(document, ctx.config.tracking_document_path());
    patch_document(&doc, MODULES_BEGIN, MODULES_END, &render::module_table(&statuses))?;

    let ui = &ctx.ui;
    ui.line(ui.heading("Module status"));
    for s in &statuses {
        ui.line(format!("  {:<5} {:<36} {}", s.code, s.name, ui.percent(f64::from(s.progress))));
    }
    ui.line(format!("  average: {}", ui.percent(totals.average_progress)));
    Ok(())
}
