// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Scan command - tallies PRD document status per module

use super::Context;
use anyhow::Result;
use chrono::{DateTime, Utc};
use prd_tracker::aggregate::{Aggregate, ModuleGroup};
use prd_tracker::pipeline;
use prd_tracker::schema::SCHEMA_VERSION;
use prd_tracker::scoring;
use prd_tracker::types::StatusCounts;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// `prd_status.json`
#[derive(Serialize)]
struct PrdStatus<'a> {
    generated_at: DateTime<Utc>,
    schema_version: u32,
    overall_progress: f64,
    totals: StatusCounts,
    modules: &'a [ModuleGroup],
}

/// `fr_ids.json`
#[derive(Serialize)]
struct FrIds {
    fr_ids: Vec<String>,
    total: usize,
}

/// Run the scan command
pub fn run(ctx: &Context, dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let prd = ctx.path_or(dir, ctx.config.prd_path());
    info!("Scanning PRD documents in {}", prd.display());

    let aggregate = pipeline::scan_dir(&prd)?;
    let out = ctx.output_dir(output)?;
    write(ctx, &aggregate, &out)?;
    summarize(ctx, &aggregate);
    Ok(())
}

fn write(ctx: &Context, aggregate: &Aggregate, out: &std::path::Path) -> Result<()> {
    let status = PrdStatus {
        generated_at: Utc::now(),
        schema_version: SCHEMA_VERSION,
        overall_progress: scoring::overall_progress(&aggregate.totals),
        totals: aggregate.totals,
        modules: &aggregate.modules,
    };
    ctx.write_json(out, "prd_status.json", &status)?;

    let fr_ids = aggregate.fr_ids();
    let ids = FrIds { total: fr_ids.len(), fr_ids };
    ctx.write_json(out, "fr_ids.json", &ids)?;
    Ok(())
}

fn summarize(ctx: &Context, aggregate: &Aggregate) {
    let ui = &ctx.ui;
    let t = &aggregate.totals;
    ui.line(ui.heading("PRD status"));
    ui.line(format!("  modules:     {}", aggregate.modules.len()));
    ui.line(format!("  documents:   {}", t.total));
    ui.line(format!("  completed:   {}", t.completed));
    ui.line(format!("  draft:       {}", t.draft));
    ui.line(format!("  in progress: {}", t.in_progress));
    ui.line(format!("  not started: {}", t.not_started));
    ui.line(format!("  blocked:     {}", t.blocked));
    ui.line(format!("  progress:    {}", ui.percent(scoring::overall_progress(t))));
}
