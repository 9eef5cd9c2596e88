// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Scan → aggregate → resolve → score
//!
//! Each stage is a plain function over the previous stage's output; the
//! commands decide which stages to run and what to write.

use crate::aggregate::{Aggregate, ModuleGroup};
use crate::config::Config;
use crate::issues::IssueReport;
use crate::render;
use crate::resolver::Resolver;
use crate::scanner::{module_name, Scanner};
use crate::scoring::{self, Factor, WeightTable};
use crate::types::{ModuleReport, Report, Status, Unit, UnitRow};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

/// Scan the PRD tree and aggregate, checking the tallies
pub fn scan(config: &Config) -> Result<Aggregate> {
    scan_dir(&config.prd_path())
}

/// Scan an explicit PRD directory
pub fn scan_dir(prd: &Path) -> Result<Aggregate> {
    let scanner = Scanner::new(prd);
    let dirs = scanner.module_dirs();
    let mut aggregate = Aggregate::from_units(scanner.units());
    for dir in &dirs {
        aggregate.ensure_module(&module_name(dir));
    }
    aggregate.verify().context("Status tallies are inconsistent")?;
    info!(
        "Scanned {} documents in {} modules",
        aggregate.totals.total,
        aggregate.modules.len()
    );
    Ok(aggregate)
}

/// Index source and test trees
pub fn resolver(config: &Config) -> Result<Resolver> {
    Resolver::build(&config.src_path(), &config.tests_path(), config.code_extensions.clone())
        .context("Failed to compile test file patterns")
}

/// Implementation state of one unit.
///
/// Completed when the source tree matches the unit by name, in progress when
/// only the module's source directory exists.
#[must_use]
pub fn implementation_state(matched: bool, module_src: &Path) -> Status {
    if matched {
        Status::Completed
    } else if module_src.is_dir() {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

fn present(flag: bool) -> Status {
    if flag {
        Status::Completed
    } else {
        Status::NotStarted
    }
}

/// Score one unit and build its matrix row
#[must_use]
pub fn unit_row(
    unit: &Unit,
    resolver: &Resolver,
    issues: &IssueReport,
    table: &WeightTable,
    src: &Path,
) -> UnitRow {
    let fr_id = unit.fr_id.as_deref().unwrap_or_default();
    let xref = resolver.resolve(&unit.module_abbr, fr_id);
    let implementation = implementation_state(xref.has_implementation, &src.join(&unit.module));

    let score = table.score(&[
        (Factor::Prd, unit.status),
        (Factor::Implementation, implementation),
        (Factor::UnitTest, present(xref.has_unit_test)),
        (Factor::IntegrationTest, present(xref.has_integration_test)),
    ]);

    UnitRow {
        fr_id: unit.fr_id.clone().unwrap_or_else(|| "-".to_string()),
        module_abbr: unit.module_abbr.clone(),
        status: unit.status,
        status_tag: unit.status_tag.clone(),
        file_path: unit.file_path.clone(),
        implementation,
        implementation_files: xref.implementation_files,
        has_unit_test: xref.has_unit_test,
        has_integration_test: xref.has_integration_test,
        open_issues: if fr_id.is_empty() { 0 } else { issues.open_for(fr_id) },
        score,
    }
}

fn module_report(
    group: &ModuleGroup,
    config: &Config,
    resolver: &Resolver,
    issues: &IssueReport,
) -> ModuleReport {
    let src = config.src_path();
    let units: Vec<UnitRow> = group
        .units
        .iter()
        .map(|u| unit_row(u, resolver, issues, &config.weights.unit, &src))
        .collect();
    let scores: Vec<u32> = units.iter().map(|u| u.score).collect();

    ModuleReport {
        dir: group.name.clone(),
        code: group.code.clone(),
        name: config
            .module_name(&group.code)
            .map_or_else(|| group.name.clone(), String::from),
        counts: group.counts,
        progress: scoring::mean_score(&scores),
        units,
    }
}

/// Roll everything up into a report and stamp the matrix digest
pub fn build_report(
    config: &Config,
    aggregate: &Aggregate,
    resolver: &Resolver,
    issues: &IssueReport,
) -> Result<Report> {
    aggregate.verify().context("Status tallies are inconsistent")?;

    let modules: Vec<ModuleReport> = aggregate
        .modules
        .iter()
        .map(|g| module_report(g, config, resolver, issues))
        .collect();
    let scores: Vec<u32> = modules
        .iter()
        .flat_map(|m| m.units.iter().map(|u| u.score))
        .collect();

    let mut report = Report {
        generated_at: Utc::now(),
        totals: aggregate.totals,
        overall_progress: scoring::overall_progress(&aggregate.totals),
        average_score: scoring::mean_score(&scores),
        status_histogram: aggregate.totals.histogram(),
        modules,
        issue_source: issues.source.clone(),
        matrix_digest: String::new(),
    };
    report.matrix_digest = render::digest(&render::matrix(&report));
    debug!("Matrix digest {}", report.matrix_digest);
    Ok(report)
}

/// Scan, resolve and score in one go
pub fn run(config: &Config, issues: &IssueReport) -> Result<Report> {
    let aggregate = scan(config)?;
    let resolver = resolver(config)?;
    build_report(config, &aggregate, &resolver, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "PRD/02-CRM-Customer/cm/prd.md", "# [CRM-CM]\nFR-001\n**狀態**: ✅ 完成\n");
        write(tmp.path(), "PRD/02-CRM-Customer/pm/prd.md", "# [CRM-PM]\nFR-002\n📝 草稿\n");
        write(tmp.path(), "PRD/05-OP-Operations/.keep", "");
        write(tmp.path(), "src/crm_cm/service.ts", "");
        write(tmp.path(), "tests/unit/crm.test.ts", "// FR-001");
        tmp
    }

    #[test]
    fn report_scores_units_and_modules() {
        let tmp = project();
        let config = Config::for_root(tmp.path()).unwrap();
        let report = run(&config, &issues::mock()).unwrap();

        assert_eq!(report.totals.total, 2);
        assert_eq!(report.modules.len(), 2);
        let crm = &report.modules[0];
        assert_eq!(crm.code, "CRM");
        assert_eq!(crm.name, "Customer Relationship Management");

        let first = &crm.units[0];
        assert_eq!(first.implementation, Status::Completed);
        assert!(first.has_unit_test);
        assert_eq!(first.open_issues, 1);
        assert_eq!(first.score, 40 + 30 + 15);

        let second = &crm.units[1];
        assert_eq!(second.implementation, Status::NotStarted);
        assert_eq!(second.score, 20);
        assert_eq!(crm.progress, 52.5);

        let op = &report.modules[1];
        assert_eq!(op.counts.total, 0);
        assert_eq!(op.progress, 0.0);
        assert_eq!(report.issue_source, "mock");
        assert_eq!(report.matrix_digest.len(), 64);
    }

    #[test]
    fn scores_never_exceed_hundred() {
        let tmp = project();
        let config = Config::for_root(tmp.path()).unwrap();
        let report = run(&config, &issues::mock()).unwrap();
        assert!(report.modules.iter().flat_map(|m| &m.units).all(|u| u.score <= 100));
    }

    #[test]
    fn empty_tree_reports_zero() {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_root(tmp.path()).unwrap();
        let report = run(&config, &issues::mock()).unwrap();
        assert_eq!(report.totals.total, 0);
        assert_eq!(report.overall_progress, 0.0);
        assert_eq!(report.average_score, 0.0);
    }

    #[test]
    fn rendering_is_deterministic() {
        let tmp = project();
        let config = Config::for_root(tmp.path()).unwrap();
        let a = run(&config, &issues::mock()).unwrap();
        let b = run(&config, &issues::mock()).unwrap();
        assert_eq!(render::matrix(&a), render::matrix(&b));
        assert_eq!(a.matrix_digest, b.matrix_digest);
    }
}
