// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Issues command - issue tracker status per requirement

use super::Context;
use anyhow::Result;
use prd_tracker::issues;
use std::path::PathBuf;

/// Run the issues command
pub fn run(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let report = issues::collect(&ctx.config.github);

    let out = ctx.output_dir(output)?;
    ctx.write_json(&out, "issue_status.json", &report)?;

    let ui = &ctx.ui;
    let k = &report.issues_by_status;
    ui.line(ui.heading("Issues"));
    ui.line(format!("  source:  {}", ui.source(&report.source)));
    ui.line(format!("  total:   {}", report.total_issues));
    ui.line(format!("  open:    {}", report.open_issues));
    ui.line(format!("  closed:  {}", report.closed_issues));
    ui.line(format!(
        "  kinds:   bug {}, enhancement {}, documentation {}, other {}",
        k.bug, k.enhancement, k.documentation, k.other
    ));
    ui.line(format!("  linked requirements: {}", report.issues_by_fr.len()));
    Ok(())
}
