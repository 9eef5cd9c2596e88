// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Issue tracker client
//!
//! Fetches the most recent issues of the configured repository and indexes
//! them by requirement identifier. Any failure falls back to a fixed mock
//! dataset tagged `"source": "mock"`.

use crate::config::GithubConfig;
use crate::schema;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Most recent issues kept in a report
pub const RECENT_LIMIT: usize = 10;

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// Issue fetch errors
#[derive(Debug, Error)]
pub enum IssueError {
    /// No token configured
    #[error("no issue tracker token configured")]
    MissingToken,

    /// Transport or decode failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status
    #[error("issue tracker returned {status}: {body}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Response body
        body: String,
    },
}

/// Issue label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name
    pub name: String,
}

/// An issue as returned by the tracker API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: u64,
    /// Title
    pub title: String,
    /// `open` or `closed`
    pub state: String,
    /// Creation timestamp as sent by the API
    pub created_at: String,
    /// Body text
    #[serde(default)]
    pub body: Option<String>,
    /// Labels
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl Issue {
    /// Whether the issue is still open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    /// Requirement identifiers mentioned in title, body and label names
    #[must_use]
    pub fn fr_ids(&self) -> Vec<String> {
        let mut ids = schema::all_fr_ids(&self.title);
        let rest = self
            .body
            .iter()
            .map(String::as_str)
            .chain(self.labels.iter().map(|l| l.name.as_str()));
        for text in rest {
            for id in schema::all_fr_ids(text) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        ids
    }

    /// Bucket by label first, then by title keyword
    #[must_use]
    pub fn kind(&self) -> IssueKind {
        let labels: Vec<String> = self.labels.iter().map(|l| l.name.to_lowercase()).collect();
        let title = self.title.to_lowercase();
        let has = |label: &str| labels.iter().any(|l| l == label);

        if has("bug") || title.contains("bug") {
            IssueKind::Bug
        } else if has("enhancement") || title.contains("feature") {
            IssueKind::Enhancement
        } else if has("documentation") || title.contains("docs") {
            IssueKind::Documentation
        } else {
            IssueKind::Other
        }
    }
}

/// Issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Defect
    Bug,
    /// Feature request
    Enhancement,
    /// Documentation
    Documentation,
    /// Anything else
    Other,
}

/// Issue counts per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    /// Bugs
    pub bug: usize,
    /// Enhancements
    pub enhancement: usize,
    /// Documentation
    pub documentation: usize,
    /// Other
    pub other: usize,
}

impl KindCounts {
    fn record(&mut self, kind: IssueKind) {
        match kind {
            IssueKind::Bug => self.bug += 1,
            IssueKind::Enhancement => self.enhancement += 1,
            IssueKind::Documentation => self.documentation += 1,
            IssueKind::Other => self.other += 1,
        }
    }
}

/// Compact issue reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Issue number
    pub number: u64,
    /// Title
    pub title: String,
    /// State
    pub state: String,
    /// Creation timestamp
    pub created_at: String,
    /// Mentioned identifiers, only listed for recent issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr_ids: Option<Vec<String>>,
}

impl IssueRef {
    fn from_issue(issue: &Issue, fr_ids: Option<Vec<String>>) -> Self {
        Self {
            number: issue.number,
            title: issue.title.clone(),
            state: issue.state.clone(),
            created_at: issue.created_at.clone(),
            fr_ids,
        }
    }
}

/// Issues linked to one requirement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrIssues {
    /// Open count
    pub open: usize,
    /// Closed count
    pub closed: usize,
    /// Linked issues
    pub issues: Vec<IssueRef>,
}

/// Issue status roll-up, written as `issue_status.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueReport {
    /// All issues
    pub total_issues: usize,
    /// Open issues
    pub open_issues: usize,
    /// Closed issues
    pub closed_issues: usize,
    /// Per-identifier index
    pub issues_by_fr: BTreeMap<String, FrIssues>,
    /// Per-category counts
    pub issues_by_status: KindCounts,
    /// Newest issues first
    pub recent_issues: Vec<IssueRef>,
    /// `github` or `mock`
    pub source: String,
    /// Titles of every open issue, for per-module counts
    #[serde(skip)]
    pub open_titles: Vec<String>,
}

impl IssueReport {
    /// Open issues mentioning a requirement
    #[must_use]
    pub fn open_for(&self, fr_id: &str) -> usize {
        self.issues_by_fr.get(fr_id).map_or(0, |f| f.open)
    }

    /// Open issues whose title mentions a module code
    #[must_use]
    pub fn open_for_module(&self, code: &str) -> usize {
        self.open_titles.iter().filter(|t| t.contains(code)).count()
    }

    /// Whether this report holds real tracker data
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.source == "mock"
    }
}

/// Roll up a list of issues
#[must_use]
pub fn summarize(issues: &[Issue], source: &str) -> IssueReport {
    let mut report = IssueReport {
        total_issues: 0,
        open_issues: 0,
        closed_issues: 0,
        issues_by_fr: BTreeMap::new(),
        issues_by_status: KindCounts::default(),
        recent_issues: Vec::new(),
        source: source.to_string(),
        open_titles: Vec::new(),
    };

    for issue in issues {
        report.total_issues += 1;
        if issue.is_open() {
            report.open_issues += 1;
            report.open_titles.push(issue.title.clone());
        } else {
            report.closed_issues += 1;
        }
        report.issues_by_status.record(issue.kind());

        let ids = issue.fr_ids();
        for id in &ids {
            let entry = report.issues_by_fr.entry(id.clone()).or_default();
            if issue.is_open() {
                entry.open += 1;
            } else {
                entry.closed += 1;
            }
            entry.issues.push(IssueRef::from_issue(issue, None));
        }

        if report.recent_issues.len() < RECENT_LIMIT {
            report.recent_issues.push(IssueRef::from_issue(issue, Some(ids)));
        }
    }
    report
}

/// The fixed fallback dataset
#[must_use]
pub fn mock() -> IssueReport {
    let first = IssueRef {
        number: 1,
        title: "FR-001: 客戶管理功能問題".into(),
        state: "open".into(),
        created_at: "2024-01-01T10:00:00Z".into(),
        fr_ids: None,
    };
    let second = IssueRef {
        number: 2,
        title: "FR-002: 測試覆蓋率不足".into(),
        state: "closed".into(),
        created_at: "2024-01-02T10:00:00Z".into(),
        fr_ids: None,
    };

    let mut issues_by_fr = BTreeMap::new();
    issues_by_fr.insert(
        "FR-001".to_string(),
        FrIssues { open: 1, closed: 0, issues: vec![first.clone()] },
    );
    issues_by_fr.insert(
        "FR-002".to_string(),
        FrIssues { open: 0, closed: 1, issues: vec![second.clone()] },
    );

    let open_titles = vec![first.title.clone()];
    IssueReport {
        total_issues: 5,
        open_issues: 3,
        closed_issues: 2,
        issues_by_fr,
        issues_by_status: KindCounts { bug: 2, enhancement: 1, documentation: 1, other: 1 },
        recent_issues: vec![
            IssueRef { fr_ids: Some(vec!["FR-001".into()]), ..first },
            IssueRef { fr_ids: Some(vec!["FR-002".into()]), ..second },
        ],
        source: "mock".into(),
        open_titles,
    }
}

/// Blocking client for the issue tracker API
#[derive(Debug, Clone)]
pub struct IssueClient {
    config: GithubConfig,
    client: Client,
}

impl IssueClient {
    /// Build a client with the configured timeout
    pub fn new(config: GithubConfig) -> Result<Self, IssueError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// Fetch one page of issues, newest first
    pub fn fetch(&self) -> Result<Vec<Issue>, IssueError> {
        let token = self.config.token.as_deref().ok_or(IssueError::MissingToken)?;
        let url = format!(
            "{}/repos/{}/issues",
            self.config.api_url.trim_end_matches('/'),
            self.config.repository
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("state", "all"),
                ("per_page", "100"),
                ("sort", "created"),
                ("direction", "desc"),
            ])
            .bearer_auth(token)
            .header(ACCEPT, ACCEPT_HEADER)
            .header(USER_AGENT, concat!("prdtrack/", env!("CARGO_PKG_VERSION")))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IssueError::Status { status, body });
        }
        Ok(response.json()?)
    }

    /// Fetch and summarize; every failure yields the mock dataset
    #[must_use]
    pub fn report(&self) -> IssueReport {
        match self.fetch() {
            Ok(issues) => {
                info!("Fetched {} issues from {}", issues.len(), self.config.repository);
                summarize(&issues, "github")
            }
            Err(IssueError::MissingToken) => {
                info!("No issue tracker token, using mock issue data");
                mock()
            }
            Err(e) => {
                warn!("Issue fetch failed, using mock issue data: {}", e);
                mock()
            }
        }
    }
}

/// Collect the issue report for a configuration, never failing
#[must_use]
pub fn collect(config: &GithubConfig) -> IssueReport {
    match IssueClient::new(config.clone()) {
        Ok(client) => client.report(),
        Err(e) => {
            warn!("Could not build HTTP client, using mock issue data: {}", e);
            mock()
        }
    }
}
