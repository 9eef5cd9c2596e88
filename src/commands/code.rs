// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Code command - which requirements have source files

use super::Context;
use anyhow::{Context as _, Result};
use prd_tracker::pipeline;
use prd_tracker::resolver::{self, Resolver};
use std::path::PathBuf;
use tracing::info;

/// Run the code command
pub fn run(ctx: &Context, dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let src = ctx.path_or(dir, ctx.config.src_path());
    info!("Checking source tree {}", src.display());

    let aggregate = pipeline::scan(&ctx.config)?;
    let index = Resolver::build(&src, &ctx.config.tests_path(), ctx.config.code_extensions.clone())
        .context("Failed to compile test file patterns")?;
    let report = resolver::code_status(&aggregate, &index, &src);

    let out = ctx.output_dir(output)?;
    ctx.write_json(&out, "code_status.json", &report)?;

    let ui = &ctx.ui;
    let matched = report
        .modules
        .iter()
        .flat_map(|m| &m.submodules)
        .filter(|u| u.has_code)
        .count();
    ui.line(ui.heading("Code status"));
    ui.line(format!("  modules:         {}", report.total_modules));
    ui.line(format!(
        "  with code:       {}",
        ui.verdict(&report.modules_with_code.to_string(), report.modules_with_code > 0)
    ));
    ui.line(format!("  without code:    {}", report.modules_without_code));
    ui.line(format!("  matched docs:    {}/{}", matched, aggregate.totals.total));
    Ok(())
}
