// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status aggregation - per-module and global tallies

use crate::schema;
use crate::types::{Status, StatusCounts, Unit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when the global tally disagrees with the module tallies
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// Global total is not the sum of module totals
    #[error("global {field} is {global} but modules sum to {modules}")]
    Mismatch {
        /// Which count disagrees
        field: &'static str,
        /// Global value
        global: usize,
        /// Sum over modules
        modules: usize,
    },
    /// A tally's buckets do not add up to its total
    #[error("{scope}: {classified} classified units but total is {total}")]
    Unbalanced {
        /// Module name or `global`
        scope: String,
        /// Sum of the five buckets
        classified: usize,
        /// Recorded total
        total: usize,
    },
}

/// All units of one module with their tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleGroup {
    /// Module directory name
    pub name: String,
    /// Module code derived from the directory name
    pub code: String,
    /// Units in scan order
    pub units: Vec<Unit>,
    /// Tally of `units`
    pub counts: StatusCounts,
}

impl ModuleGroup {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            code: schema::module_code_from_dir(name),
            units: Vec::new(),
            counts: StatusCounts::default(),
        }
    }

    /// Units classified `Completed`
    #[must_use]
    pub fn completed(&self) -> usize {
        self.counts.completed
    }
}

/// Aggregated scan result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Modules in first-seen order
    pub modules: Vec<ModuleGroup>,
    /// Global tally
    pub totals: StatusCounts,
}

impl Aggregate {
    /// Bucket a unit sequence into modules
    pub fn from_units(units: impl IntoIterator<Item = Unit>) -> Self {
        let mut aggregate = Self::default();
        for unit in units {
            aggregate.push(unit);
        }
        aggregate
    }

    /// Add an empty module so it shows up even without documents
    pub fn ensure_module(&mut self, name: &str) {
        if !self.modules.iter().any(|m| m.name == name) {
            self.modules.push(ModuleGroup::new(name));
        }
    }

    fn push(&mut self, unit: Unit) {
        self.totals.record(&unit);
        let index = match self.modules.iter().position(|m| m.name == unit.module) {
            Some(index) => index,
            None => {
                self.modules.push(ModuleGroup::new(&unit.module));
                self.modules.len() - 1
            }
        };
        let group = &mut self.modules[index];
        group.counts.record(&unit);
        group.units.push(unit);
    }

    /// Check that global counts equal the sum of module counts
    pub fn verify(&self) -> Result<(), AggregateError> {
        let mut summed = StatusCounts::default();
        for module in &self.modules {
            check_balanced(&module.name, &module.counts)?;
            summed.merge(&module.counts);
        }
        check_balanced("global", &self.totals)?;

        let pairs = [
            ("total", self.totals.total, summed.total),
            ("completed", self.totals.completed, summed.completed),
            ("draft", self.totals.draft, summed.draft),
            ("in_progress", self.totals.in_progress, summed.in_progress),
            ("not_started", self.totals.not_started, summed.not_started),
            ("blocked", self.totals.blocked, summed.blocked),
            ("unparsed", self.totals.unparsed, summed.unparsed),
        ];
        for (field, global, modules) in pairs {
            if global != modules {
                return Err(AggregateError::Mismatch { field, global, modules });
            }
        }
        Ok(())
    }

    /// Sorted requirement identifiers of every parsed unit
    #[must_use]
    pub fn fr_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .units()
            .filter_map(|u| u.fr_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Every unit across modules
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.modules.iter().flat_map(|m| m.units.iter())
    }

    /// Count of units in a status class
    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.totals.get(status)
    }
}

fn check_balanced(scope: &str, counts: &StatusCounts) -> Result<(), AggregateError> {
    let classified = counts.classified();
    if classified == counts.total {
        Ok(())
    } else {
        Err(AggregateError::Unbalanced {
            scope: scope.to_string(),
            classified,
            total: counts.total,
        })
    }
}
