// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Progress scoring with fixed weight tables

use crate::types::{Status, StatusCounts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum score any unit or module can reach
pub const MAX_SCORE: u32 = 100;

/// Errors raised while building a weight table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeightError {
    /// Per-factor maxima do not add up to [`MAX_SCORE`]
    #[error("weight table maxima sum to {0}, expected {MAX_SCORE}")]
    BadTotal(u32),
    /// Unknown factor name in configuration
    #[error("unknown scoring factor: {0}")]
    UnknownFactor(String),
    /// Unknown status name in configuration
    #[error("unknown factor state: {0}")]
    UnknownState(String),
}

/// A scored dimension of progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// PRD document status
    Prd,
    /// New-system implementation
    Implementation,
    /// Integration with surrounding systems
    SystemIntegration,
    /// Unit tests
    UnitTest,
    /// Integration tests
    IntegrationTest,
}

impl Factor {
    /// Every factor
    pub const ALL: [Self; 5] = [
        Self::Prd,
        Self::Implementation,
        Self::SystemIntegration,
        Self::UnitTest,
        Self::IntegrationTest,
    ];

    /// Name used in configuration files
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Prd => "prd",
            Self::Implementation => "implementation",
            Self::SystemIntegration => "system_integration",
            Self::UnitTest => "unit_test",
            Self::IntegrationTest => "integration_test",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

fn parse_state(name: &str) -> Option<Status> {
    Status::ALL.into_iter().find(|s| s.code() == name)
}

type RawTable = BTreeMap<String, BTreeMap<String, u32>>;

/// Points awarded per factor state: `{factor: {state: points}}`.
///
/// The maxima of every factor always sum to [`MAX_SCORE`]; construction
/// fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct WeightTable {
    points: BTreeMap<Factor, BTreeMap<Status, u32>>,
}

impl WeightTable {
    /// Build and validate a table
    pub fn new(points: BTreeMap<Factor, BTreeMap<Status, u32>>) -> Result<Self, WeightError> {
        let table = Self { points };
        let total = table.max_total();
        if total != MAX_SCORE {
            return Err(WeightError::BadTotal(total));
        }
        Ok(table)
    }

    fn from_pairs(entries: &[(Factor, &[(Status, u32)])]) -> Result<Self, WeightError> {
        let points = entries
            .iter()
            .map(|(factor, states)| (*factor, states.iter().copied().collect()))
            .collect();
        Self::new(points)
    }

    /// Per-requirement table: PRD 40, implementation 30, unit 15, integration 15
    pub fn unit_default() -> Result<Self, WeightError> {
        Self::from_pairs(&[
            (
                Factor::Prd,
                &[(Status::Completed, 40), (Status::InProgress, 30), (Status::Draft, 20)],
            ),
            (Factor::Implementation, &[(Status::Completed, 30), (Status::InProgress, 15)]),
            (Factor::UnitTest, &[(Status::Completed, 15)]),
            (Factor::IntegrationTest, &[(Status::Completed, 15)]),
        ])
    }

    /// Per-module go-live table: implementation 30, PRD 20, system integration 20,
    /// unit 15, integration 15
    pub fn module_default() -> Result<Self, WeightError> {
        Self::from_pairs(&[
            (Factor::Implementation, &[(Status::Completed, 30), (Status::InProgress, 15)]),
            (Factor::Prd, &[(Status::Completed, 20), (Status::InProgress, 10)]),
            (
                Factor::SystemIntegration,
                &[(Status::Completed, 20), (Status::InProgress, 10)],
            ),
            (Factor::UnitTest, &[(Status::Completed, 15)]),
            (Factor::IntegrationTest, &[(Status::Completed, 15)]),
        ])
    }

    /// Sum of each factor's best state, saturating at `u32::MAX`
    #[must_use]
    pub fn max_total(&self) -> u32 {
        self.points
            .values()
            .map(|states| states.values().copied().max().unwrap_or(0))
            .fold(0, u32::saturating_add)
    }

    /// Points for one factor state; anything unlisted is worth 0
    #[must_use]
    pub fn points(&self, factor: Factor, state: Status) -> u32 {
        self.points
            .get(&factor)
            .and_then(|states| states.get(&state))
            .copied()
            .unwrap_or(0)
    }

    /// Score a set of factor states, capped at [`MAX_SCORE`]
    #[must_use]
    pub fn score(&self, states: &[(Factor, Status)]) -> u32 {
        states
            .iter()
            .map(|(f, s)| self.points(*f, *s))
            .fold(0, u32::saturating_add)
            .min(MAX_SCORE)
    }
}

impl TryFrom<RawTable> for WeightTable {
    type Error = WeightError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let mut points = BTreeMap::new();
        for (factor_name, states) in raw {
            let factor =
                Factor::parse(&factor_name).ok_or(WeightError::UnknownFactor(factor_name))?;
            let mut parsed = BTreeMap::new();
            for (state_name, value) in states {
                let state = parse_state(&state_name).ok_or(WeightError::UnknownState(state_name))?;
                parsed.insert(state, value);
            }
            points.insert(factor, parsed);
        }
        Self::new(points)
    }
}

impl From<WeightTable> for RawTable {
    fn from(table: WeightTable) -> Self {
        table
            .points
            .into_iter()
            .map(|(factor, states)| {
                let states = states.into_iter().map(|(s, p)| (s.code().to_string(), p)).collect();
                (factor.name().to_string(), states)
            })
            .collect()
    }
}

/// Progress contribution of a unit's PRD status alone.
///
/// Monotonic in rank: not started < draft < in progress < completed.
#[must_use]
pub fn status_progress(status: Status) -> u32 {
    match status {
        Status::Completed => 100,
        Status::InProgress => 60,
        Status::Draft => 30,
        Status::NotStarted | Status::Blocked => 0,
    }
}

/// Status-weighted overall progress, one decimal; 0 when there are no units
#[must_use]
pub fn overall_progress(counts: &StatusCounts) -> f64 {
    if counts.total == 0 {
        return 0.0;
    }
    let weighted: usize = Status::ALL
        .iter()
        .map(|s| counts.get(*s) * status_progress(*s) as usize)
        .sum();
    round1(weighted as f64 / counts.total as f64)
}

/// Mean of a set of scores, one decimal; 0 for an empty set
#[must_use]
pub fn mean_score(scores: &[u32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: u64 = scores.iter().map(|s| u64::from(*s)).sum();
    round1(sum as f64 / scores.len() as f64)
}

/// Round to one decimal place
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage helper that returns 0 for an empty denominator
#[must_use]
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_sum_to_hundred() {
        assert_eq!(WeightTable::unit_default().unwrap().max_total(), 100);
        assert_eq!(WeightTable::module_default().unwrap().max_total(), 100);
    }

    #[test]
    fn bad_total_is_rejected() {
        let mut points = BTreeMap::new();
        points.insert(Factor::Prd, [(Status::Completed, 50)].into_iter().collect());
        assert_eq!(WeightTable::new(points), Err(WeightError::BadTotal(50)));
    }

    #[test]
    fn huge_points_are_rejected_without_overflow() {
        let mut points = BTreeMap::new();
        points.insert(Factor::Prd, BTreeMap::from([(Status::Completed, u32::MAX)]));
        points.insert(Factor::Implementation, BTreeMap::from([(Status::Completed, 1)]));
        assert_eq!(WeightTable::new(points), Err(WeightError::BadTotal(u32::MAX)));

        let raw = RawTable::from([
            ("prd".to_string(), BTreeMap::from([("completed".to_string(), u32::MAX)])),
            ("unit_test".to_string(), BTreeMap::from([("completed".to_string(), u32::MAX)])),
        ]);
        assert_eq!(WeightTable::try_from(raw), Err(WeightError::BadTotal(u32::MAX)));
    }

    #[test]
    fn repeated_factors_cap_the_score() {
        let table = WeightTable::unit_default().unwrap();
        let states = vec![(Factor::Prd, Status::Completed); 10];
        assert_eq!(table.score(&states), MAX_SCORE);
    }

    #[test]
    fn three_satisfied_factors() {
        let table = WeightTable::unit_default().unwrap();
        let score = table.score(&[
            (Factor::Prd, Status::Completed),
            (Factor::Implementation, Status::Completed),
            (Factor::UnitTest, Status::Completed),
            (Factor::IntegrationTest, Status::NotStarted),
        ]);
        assert_eq!(score, 40 + 30 + 15);
    }

    #[test]
    fn unknown_states_contribute_nothing() {
        let table = WeightTable::unit_default().unwrap();
        assert_eq!(table.points(Factor::UnitTest, Status::Draft), 0);
        assert_eq!(table.points(Factor::SystemIntegration, Status::Completed), 0);
    }

    #[test]
    fn score_is_capped() {
        let table = WeightTable::unit_default().unwrap();
        let repeated = vec![(Factor::Prd, Status::Completed); 10];
        assert_eq!(table.score(&repeated), MAX_SCORE);
    }

    #[test]
    fn overall_progress_handles_empty() {
        assert_eq!(overall_progress(&StatusCounts::default()), 0.0);
    }

    #[test]
    fn overall_progress_weights() {
        let counts = StatusCounts {
            total: 4,
            completed: 1,
            draft: 1,
            in_progress: 1,
            not_started: 1,
            ..Default::default()
        };
        // (100 + 30 + 60) / 4
        assert_eq!(overall_progress(&counts), 47.5);
    }

    #[test]
    fn raw_round_trip_keeps_validation() {
        let raw: RawTable = WeightTable::unit_default().unwrap().into();
        assert!(raw.contains_key("prd"));
        let table = WeightTable::try_from(raw).unwrap();
        assert_eq!(table.max_total(), 100);

        let mut bad: RawTable = BTreeMap::new();
        bad.insert("velocity".into(), BTreeMap::new());
        assert_eq!(
            WeightTable::try_from(bad),
            Err(WeightError::UnknownFactor("velocity".into()))
        );
    }
}
