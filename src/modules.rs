// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Module go-live status
//!
//! One row per registered module code, scored with the module weight table.

use crate::config::Config;
use crate::issues::IssueReport;
use crate::schema;
use crate::scoring::{Factor, WeightTable};
use crate::types::{ModuleEntry, Status};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A `prd.md` longer than this many characters counts as complete
pub const SUBSTANTIAL_PRD_CHARS: usize = 500;

/// Status of one module across every go-live dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    /// Module code
    pub code: String,
    /// Display name
    pub name: String,
    /// A legacy system is still running
    pub legacy_system: bool,
    /// PRD state
    pub prd: Status,
    /// New-system implementation state
    pub implementation: Status,
    /// System integration state
    pub system_integration: Status,
    /// Unit tests
    pub unit_test: Status,
    /// Integration tests
    pub integration_test: Status,
    /// Open issues mentioning the code
    pub open_issues: usize,
    /// Module-table score
    pub progress: u32,
}

impl ModuleStatus {
    /// Factor states fed to the weight table
    #[must_use]
    pub fn factors(&self) -> [(Factor, Status); 5] {
        [
            (Factor::Implementation, self.implementation),
            (Factor::Prd, self.prd),
            (Factor::SystemIntegration, self.system_integration),
            (Factor::UnitTest, self.unit_test),
            (Factor::IntegrationTest, self.integration_test),
        ]
    }
}

/// Dimension counts across all modules
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleTotals {
    /// Modules checked
    pub modules: usize,
    /// With a legacy system
    pub legacy_systems: usize,
    /// Implementation started
    pub implementation_started: usize,
    /// PRD started or complete
    pub prd_started: usize,
    /// Integration started
    pub integration_started: usize,
    /// Unit tests present
    pub unit_tested: usize,
    /// Integration tests present
    pub integration_tested: usize,
    /// Mean progress
    pub average_progress: f64,
}

fn count(statuses: &[ModuleStatus], pred: impl Fn(&ModuleStatus) -> bool) -> usize {
    statuses.iter().filter(|s| pred(*s)).count()
}

fn started(status: Status) -> bool {
    matches!(status, Status::Completed | Status::InProgress)
}

impl ModuleTotals {
    /// Tally a set of module rows
    #[must_use]
    pub fn from_statuses(statuses: &[ModuleStatus]) -> Self {
        let scores: Vec<u32> = statuses.iter().map(|s| s.progress).collect();
        Self {
            modules: statuses.len(),
            legacy_systems: count(statuses, |s| s.legacy_system),
            implementation_started: count(statuses, |s| started(s.implementation)),
            prd_started: count(statuses, |s| started(s.prd)),
            integration_started: count(statuses, |s| started(s.system_integration)),
            unit_tested: count(statuses, |s| s.unit_test == Status::Completed),
            integration_tested: count(statuses, |s| s.integration_test == Status::Completed),
            average_progress: crate::scoring::mean_score(&scores),
        }
    }
}

/// First PRD module directory whose code equals `code`
#[must_use]
pub fn prd_dir_for(prd_root: &Path, code: &str) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(prd_root)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter().find(|d| {
        d.file_name()
            .is_some_and(|n| schema::module_code_from_dir(&n.to_string_lossy()) == code)
    })
}

fn files_named(dir: &Path, name: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == name)
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn char_len(path: &Path) -> usize {
    fs::read_to_string(path).map_or(0, |c| c.chars().count())
}

/// PRD state of one module directory.
///
/// The first `prd.md` decides: substantial means complete, anything else in
/// progress. Without one, a substantial `README.md` means in progress.
#[must_use]
pub fn prd_status(module_dir: Option<&Path>) -> Status {
    let Some(dir) = module_dir else {
        return Status::NotStarted;
    };
    if let Some(prd) = files_named(dir, "prd.md").first() {
        return if char_len(prd) > SUBSTANTIAL_PRD_CHARS {
            Status::Completed
        } else {
            Status::InProgress
        };
    }
    if files_named(dir, "README.md")
        .iter()
        .any(|r| char_len(r) > SUBSTANTIAL_PRD_CHARS)
    {
        Status::InProgress
    } else {
        Status::NotStarted
    }
}

/// TypeScript sources whose file name contains the lower-cased code
#[must_use]
pub fn implementation_files(src: &Path, code: &str) -> Vec<PathBuf> {
    let needle = code.to_lowercase();
    WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            e.file_type().is_file()
                && name.contains(&needle)
                && (name.ends_with(".ts") || name.ends_with(".tsx"))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn has_test_named(dir: &Path, code: &str) -> bool {
    let needle = code.to_lowercase();
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file() && e.file_name().to_string_lossy().to_lowercase().contains(&needle))
}

/// Check one registered module
#[must_use]
pub fn check_module(
    config: &Config,
    table: &WeightTable,
    issues: &IssueReport,
    entry: &ModuleEntry,
) -> ModuleStatus {
    let module_dir = prd_dir_for(&config.prd_path(), &entry.code);
    let prd = prd_status(module_dir.as_deref());

    let implementation = if prd != Status::NotStarted
        && !implementation_files(&config.src_path(), &entry.code).is_empty()
    {
        Status::InProgress
    } else {
        Status::NotStarted
    };

    let tests = config.tests_path();
    let presence = |dir: &str| {
        if has_test_named(&tests.join(dir), &entry.code) {
            Status::Completed
        } else {
            Status::NotStarted
        }
    };

    let mut status = ModuleStatus {
        code: entry.code.clone(),
        name: entry.name.clone(),
        legacy_system: config.legacy_modules.contains(&entry.code),
        prd,
        implementation,
        system_integration: implementation,
        unit_test: presence("unit"),
        integration_test: presence("integration"),
        open_issues: issues.open_for_module(&entry.code),
        progress: 0,
    };
    status.progress = table.score(&status.factors());
    debug!("Module {}: {}%", status.code, status.progress);
    status
}

/// Check every registered module
#[must_use]
pub fn check_all(config: &Config, issues: &IssueReport) -> Vec<ModuleStatus> {
    config
        .modules
        .iter()
        .map(|entry| check_module(config, &config.weights.module, issues, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn prd_length_decides_status() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "long/prd.md", &"字".repeat(501));
        write(tmp.path(), "short/prd.md", "brief");
        write(tmp.path(), "readme/README.md", &"x".repeat(600));
        fs::create_dir_all(tmp.path().join("empty")).unwrap();

        assert_eq!(prd_status(Some(&tmp.path().join("long"))), Status::Completed);
        assert_eq!(prd_status(Some(&tmp.path().join("short"))), Status::InProgress);
        assert_eq!(prd_status(Some(&tmp.path().join("readme"))), Status::InProgress);
        assert_eq!(prd_status(Some(&tmp.path().join("empty"))), Status::NotStarted);
        assert_eq!(prd_status(None), Status::NotStarted);
    }

    #[test]
    fn module_row_scores_with_module_table() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "PRD/02-CRM-Customer/prd.md", &"a".repeat(600));
        write(tmp.path(), "src/pages/crm-list.tsx", "");
        write(tmp.path(), "tests/unit/test_crm.py", "");

        let config = Config::for_root(tmp.path()).unwrap();
        let entry = ModuleEntry { code: "CRM".into(), name: "Customer".into() };
        let status = check_module(&config, &config.weights.module, &issues::mock(), &entry);

        assert_eq!(status.prd, Status::Completed);
        assert_eq!(status.implementation, Status::InProgress);
        assert_eq!(status.system_integration, Status::InProgress);
        assert_eq!(status.unit_test, Status::Completed);
        assert_eq!(status.integration_test, Status::NotStarted);
        assert!(status.legacy_system);
        // 15 + 20 + 10 + 15
        assert_eq!(status.progress, 60);
    }

    #[test]
    fn no_prd_means_no_implementation() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/dsh-home.ts", "");
        let config = Config::for_root(tmp.path()).unwrap();
        let entry = ModuleEntry { code: "DSH".into(), name: "Dashboard".into() };
        let status = check_module(&config, &config.weights.module, &issues::mock(), &entry);
        assert_eq!(status.implementation, Status::NotStarted);
        assert_eq!(status.progress, 0);
        assert!(!status.legacy_system);
    }

    #[test]
    fn totals_count_dimensions() {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_root(tmp.path()).unwrap();
        let rows = check_all(&config, &issues::mock());
        let totals = ModuleTotals::from_statuses(&rows);
        assert_eq!(totals.modules, 14);
        assert_eq!(totals.legacy_systems, 10);
        assert_eq!(totals.average_progress, 0.0);
    }
}
