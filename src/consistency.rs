// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Requirement-to-test consistency

use crate::scoring::{percent, round1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Coverage target used in advice
pub const TARGET_COVERAGE: f64 = 80.0;

/// Coverage rating band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// 80% and above
    Excellent,
    /// 60% and above
    Good,
    /// 40% and above
    NeedsImprovement,
    /// Below 40%
    Poor,
}

impl Rating {
    /// Band for a coverage percentage
    #[must_use]
    pub fn for_coverage(coverage: f64) -> Self {
        if coverage >= 80.0 {
            Self::Excellent
        } else if coverage >= 60.0 {
            Self::Good
        } else if coverage >= 40.0 {
            Self::NeedsImprovement
        } else {
            Self::Poor
        }
    }

    /// Label shown in reports
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "✅ 優秀",
            Self::Good => "🟡 良好",
            Self::NeedsImprovement => "🟠 需要改進",
            Self::Poor => "🔴 需要大幅改進",
        }
    }
}

/// Consistency result, written as `validation_report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Identifiers checked
    pub total_fr_ids: usize,
    /// Identifiers found in some test file
    pub tested_fr_ids: usize,
    /// Identifiers with no test, in input order
    pub untested_fr_ids: Vec<String>,
    /// `tested / total`, 0 when there is nothing to check
    pub coverage_percentage: f64,
    /// Band of `coverage_percentage`
    pub rating: Rating,
}

/// Contents of every readable file below `tests`
#[must_use]
pub fn test_contents(tests: &Path) -> Vec<String> {
    WalkDir::new(tests)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| match fs::read_to_string(e.path()) {
            Ok(content) => Some(content),
            Err(err) => {
                warn!("Failed to read test file {}: {}", e.path().display(), err);
                None
            }
        })
        .collect()
}

/// Check each identifier against the test file contents
#[must_use]
pub fn check(fr_ids: &[String], contents: &[String]) -> ConsistencyReport {
    let untested: Vec<String> = fr_ids
        .iter()
        .filter(|id| !contents.iter().any(|c| c.contains(id.as_str())))
        .cloned()
        .collect();
    let tested = fr_ids.len() - untested.len();
    let coverage = round1(percent(tested, fr_ids.len()));

    ConsistencyReport {
        total_fr_ids: fr_ids.len(),
        tested_fr_ids: tested,
        untested_fr_ids: untested,
        coverage_percentage: coverage,
        rating: Rating::for_coverage(coverage),
    }
}

/// Check identifiers against every file below `tests`
#[must_use]
pub fn check_dir(fr_ids: &[String], tests: &Path) -> ConsistencyReport {
    check(fr_ids, &test_contents(tests))
}
