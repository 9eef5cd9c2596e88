// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! PRD tracker library - status scraping and progress dashboards
//!
//! This crate scans Markdown PRD documents for requirement identifiers and
//! status markers, cross-references them against source, tests and the issue
//! tracker, scores progress with fixed weight tables and renders the result
//! as JSON and Markdown.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod config;
pub mod consistency;
pub mod coverage;
pub mod issues;
pub mod modules;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod scoring;
pub mod validate;

/// Core data types shared by every pipeline stage
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    // =========================================================================
    // Status
    // =========================================================================

    /// Canonical status classes a PRD status tag is bucketed into
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Status {
        /// Released and stable
        Completed,
        /// Being developed or tested
        InProgress,
        /// PRD still in draft
        Draft,
        /// Nothing started yet
        NotStarted,
        /// Has open problems
        Blocked,
    }

    impl Status {
        /// Every class, in report order
        pub const ALL: [Self; 5] = [
            Self::Completed,
            Self::InProgress,
            Self::Draft,
            Self::NotStarted,
            Self::Blocked,
        ];

        /// Classify a free-form status tag by substring containment.
        ///
        /// Order matters: a tag that mentions several keywords takes the
        /// first class that matches. Unknown tags fall back to `NotStarted`.
        #[must_use]
        pub fn classify(tag: &str) -> Self {
            if tag.contains("完成") {
                Self::Completed
            } else if tag.contains("草稿") {
                Self::Draft
            } else if tag.contains("開發中") {
                Self::InProgress
            } else if tag.contains("有問題") {
                Self::Blocked
            } else {
                Self::NotStarted
            }
        }

        /// Canonical emoji-prefixed label used in PRD documents
        #[must_use]
        pub fn label(self) -> &'static str {
            match self {
                Self::Completed => "✅ 完成",
                Self::InProgress => "🟡 開發中",
                Self::Draft => "📝 草稿",
                Self::NotStarted => "🔴 未開始",
                Self::Blocked => "⚠️ 有問題",
            }
        }

        /// Short code used in JSON keys and CLI output
        #[must_use]
        pub fn code(self) -> &'static str {
            match self {
                Self::Completed => "completed",
                Self::InProgress => "in_progress",
                Self::Draft => "draft",
                Self::NotStarted => "not_started",
                Self::Blocked => "blocked",
            }
        }
    }

    impl std::fmt::Display for Status {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.label())
        }
    }

    // =========================================================================
    // Unit
    // =========================================================================

    /// One scanned PRD document (a functional-requirement record)
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Unit {
        /// Requirement identifier; `None` when the document carries none
        pub fr_id: Option<String>,
        /// Raw status tag as written in the document
        pub status_tag: String,
        /// Classified status
        pub status: Status,
        /// Owning module directory name
        pub module: String,
        /// Submodule abbreviation such as `CRM-CM`, empty when absent
        pub module_abbr: String,
        /// Source document
        pub file_path: PathBuf,
        /// Modification time of the source document
        pub last_modified: Option<DateTime<Utc>>,
    }

    impl Unit {
        /// Whether the document yielded a requirement identifier
        #[must_use]
        pub fn is_parsed(&self) -> bool {
            self.fr_id.is_some()
        }
    }

    // =========================================================================
    // Counts
    // =========================================================================

    /// Per-status tally for a module or the whole scan
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StatusCounts {
        /// All units, parsed or not
        pub total: usize,
        /// Completed units
        pub completed: usize,
        /// Draft units
        pub draft: usize,
        /// In-progress units
        pub in_progress: usize,
        /// Not-started units
        pub not_started: usize,
        /// Blocked units
        pub blocked: usize,
        /// Units without a requirement identifier
        pub unparsed: usize,
    }

    impl StatusCounts {
        /// Record one unit
        pub fn record(&mut self, unit: &Unit) {
            self.total += 1;
            *self.slot_mut(unit.status) += 1;
            if !unit.is_parsed() {
                self.unparsed += 1;
            }
        }

        /// Count for a single status class
        #[must_use]
        pub fn get(&self, status: Status) -> usize {
            match status {
                Status::Completed => self.completed,
                Status::InProgress => self.in_progress,
                Status::Draft => self.draft,
                Status::NotStarted => self.not_started,
                Status::Blocked => self.blocked,
            }
        }

        fn slot_mut(&mut self, status: Status) -> &mut usize {
            match status {
                Status::Completed => &mut self.completed,
                Status::InProgress => &mut self.in_progress,
                Status::Draft => &mut self.draft,
                Status::NotStarted => &mut self.not_started,
                Status::Blocked => &mut self.blocked,
            }
        }

        /// Sum of the five status buckets
        #[must_use]
        pub fn classified(&self) -> usize {
            Status::ALL.iter().map(|s| self.get(*s)).sum()
        }

        /// Add another tally into this one
        pub fn merge(&mut self, other: &Self) {
            self.total += other.total;
            self.completed += other.completed;
            self.draft += other.draft;
            self.in_progress += other.in_progress;
            self.not_started += other.not_started;
            self.blocked += other.blocked;
            self.unparsed += other.unparsed;
        }

        /// Histogram keyed by status
        #[must_use]
        pub fn histogram(&self) -> BTreeMap<Status, usize> {
            Status::ALL.iter().map(|s| (*s, self.get(*s))).collect()
        }
    }

    // =========================================================================
    // Module registry
    // =========================================================================

    /// Hand-curated module code and display name
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ModuleEntry {
        /// Module code, e.g. `CRM`
        pub code: String,
        /// Display name
        pub name: String,
    }

    impl ModuleEntry {
        /// The default ERP module registry
        #[must_use]
        pub fn defaults() -> Vec<Self> {
            [
                ("DSH", "Dashboard"),
                ("CRM", "Customer Relationship Management"),
                ("BDM", "Basic Data Maintenance"),
                ("IM", "Item Management"),
                ("OP", "Operations Planning"),
                ("OM", "Order Management"),
                ("MES", "Manufacturing Execution System"),
                ("WMS", "Warehouse Management System"),
                ("PM", "Purchasing Management"),
                ("LM", "Logistics Management"),
                ("FA", "Finance & Accounting"),
                ("BI", "Business Intelligence"),
                ("SA", "System Administration"),
                ("UP", "User Profile"),
            ]
            .into_iter()
            .map(|(code, name)| Self { code: code.into(), name: name.into() })
            .collect()
        }
    }

    // =========================================================================
    // Report
    // =========================================================================

    /// One row of the tracking matrix
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UnitRow {
        /// Requirement identifier, `-` when unparsed
        pub fr_id: String,
        /// Submodule abbreviation
        pub module_abbr: String,
        /// PRD status
        pub status: Status,
        /// Raw status tag
        pub status_tag: String,
        /// Source document
        pub file_path: PathBuf,
        /// Implementation state
        pub implementation: Status,
        /// Implementation files that matched
        pub implementation_files: Vec<PathBuf>,
        /// Unit test presence
        pub has_unit_test: bool,
        /// Integration test presence
        pub has_integration_test: bool,
        /// Open issues mentioning this requirement (informational)
        pub open_issues: usize,
        /// Weighted progress score, 0..=100
        pub score: u32,
    }

    /// Per-module section of a report
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ModuleReport {
        /// Module directory name
        pub dir: String,
        /// Module code derived from the directory name
        pub code: String,
        /// Display name
        pub name: String,
        /// Status tally
        pub counts: StatusCounts,
        /// Mean unit score
        pub progress: f64,
        /// Units in scan order
        pub units: Vec<UnitRow>,
    }

    /// Point-in-time roll-up of a whole run
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Report {
        /// When the report was generated
        pub generated_at: DateTime<Utc>,
        /// Global status tally
        pub totals: StatusCounts,
        /// Status-weighted overall progress
        pub overall_progress: f64,
        /// Mean unit score over all units
        pub average_score: f64,
        /// Global histogram
        pub status_histogram: BTreeMap<Status, usize>,
        /// Per-module breakdown
        pub modules: Vec<ModuleReport>,
        /// Where issue data came from (`github` or `mock`)
        pub issue_source: String,
        /// SHA-256 of the rendered Markdown matrix
        pub matrix_digest: String,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
