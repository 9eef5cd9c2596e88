// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Test coverage collection
//!
//! Runs the project's own test command, parses its summary and indexes test
//! files by the requirement identifiers they mention. Runner failures yield
//! fixed mock numbers tagged `"source": "mock"`.

use crate::resolver::{self, has_extension, TestMentions};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRun {
    /// Tests executed
    pub total: usize,
    /// Tests passed
    pub passed: usize,
    /// Tests failed
    pub failed: usize,
    /// Line coverage percentage reported by the tool
    pub coverage: f64,
    /// `measured` or `mock`
    pub source: String,
}

impl TestRun {
    fn measured(total: usize, passed: usize, failed: usize, coverage: f64) -> Self {
        Self { total, passed, failed, coverage, source: "measured".into() }
    }

    /// Fallback numbers for unit tests
    #[must_use]
    pub fn mock_unit() -> Self {
        Self { total: 10, passed: 8, failed: 2, coverage: 75.0, source: "mock".into() }
    }

    /// Fallback numbers for integration tests
    #[must_use]
    pub fn mock_integration() -> Self {
        Self { total: 5, passed: 4, failed: 1, coverage: 80.0, source: "mock".into() }
    }

    /// Whether the numbers are real
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.source == "mock"
    }
}

/// Test files covering one requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrCoverage {
    /// Test files mentioning the identifier
    pub test_files: Vec<PathBuf>,
    /// `covered`
    pub status: String,
}

/// Test presence for one source module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCoverage {
    /// Directory name under `src/`
    pub name: String,
    /// Code files in the module
    pub code_files: usize,
    /// Test files whose path mentions the module
    pub test_files: usize,
    /// `covered` or `missing`
    pub status: String,
}

/// Coverage report, written as `test_coverage.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Unit test run
    pub unit_tests: TestRun,
    /// Integration test run
    pub integration_tests: TestRun,
    /// Per source module
    pub modules: Vec<ModuleCoverage>,
    /// Per requirement identifier
    pub fr_coverage: BTreeMap<String, FrCoverage>,
}

impl CoverageReport {
    /// Identifiers with at least one test file
    #[must_use]
    pub fn covered_count(&self) -> usize {
        self.fr_coverage.values().filter(|c| c.status == "covered").count()
    }
}

/// Project ecosystem detected from its manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    /// `package.json`
    Npm,
    /// `requirements.txt`
    Python,
    /// `pom.xml`
    Maven,
}

impl ProjectKind {
    /// Detect from manifests in `root`, first match wins
    #[must_use]
    pub fn detect(root: &Path) -> Option<Self> {
        [
            ("package.json", Self::Npm),
            ("requirements.txt", Self::Python),
            ("pom.xml", Self::Maven),
        ]
        .into_iter()
        .find(|(manifest, _)| root.join(manifest).is_file())
        .map(|(_, kind)| kind)
    }

    /// Program and arguments of the test command
    #[must_use]
    pub fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Npm => ("npm", &["test", "--", "--coverage", "--json"]),
            Self::Python => ("pytest", &["--cov=src", "--cov-report=term"]),
            Self::Maven => ("mvn", &["test"]),
        }
    }

    /// Parse the command's standard output
    #[must_use]
    pub fn parse(self, stdout: &str) -> Option<TestRun> {
        match self {
            Self::Npm => parse_npm(stdout),
            Self::Python => Some(parse_pytest(stdout)),
            Self::Maven => Some(parse_maven(stdout)),
        }
    }
}

/// Parse Jest's `--json` output
#[must_use]
pub fn parse_npm(stdout: &str) -> Option<TestRun> {
    let value: serde_json::Value = serde_json::from_str(stdout).ok()?;
    let count = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    };
    let coverage = value
        .pointer("/coverage/total/lines/pct")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    Some(TestRun::measured(
        count("numTotalTests"),
        count("numPassedTests"),
        count("numFailedTests"),
        coverage,
    ))
}

/// Parse pytest's terminal summary and coverage table
#[must_use]
pub fn parse_pytest(stdout: &str) -> TestRun {
    let mut passed = 0;
    let mut failed = 0;
    let mut coverage = 0.0;

    for line in stdout.lines() {
        let count = |re: &regex::Regex| {
            re.captures(line).map(|caps| caps[1].parse::<usize>().unwrap_or(0))
        };
        let (p, f) = (count(&schema::PYTEST_PASSED), count(&schema::PYTEST_FAILED));
        if p.is_some() || f.is_some() {
            passed = p.unwrap_or(0);
            failed = f.unwrap_or(0);
        }
        if line.contains("TOTAL") {
            if let Some(caps) = schema::PERCENT.captures(line) {
                coverage = caps[1].parse().unwrap_or(0.0);
            }
        }
    }
    TestRun::measured(passed + failed, passed, failed, coverage)
}

/// Parse Maven Surefire's first `Tests run:` line
#[must_use]
pub fn parse_maven(stdout: &str) -> TestRun {
    let (total, failed) = schema::MAVEN_SUMMARY
        .captures(stdout)
        .map(|caps| (caps[1].parse().unwrap_or(0), caps[2].parse().unwrap_or(0)))
        .unwrap_or((0, 0));
    TestRun::measured(total, total.saturating_sub(failed), failed, 0.0)
}

/// Run the detected unit test command in `root`
#[must_use]
pub fn run_unit_tests(root: &Path) -> TestRun {
    let Some(kind) = ProjectKind::detect(root) else {
        info!("No test manifest found, using mock unit test data");
        return TestRun::mock_unit();
    };

    let (program, args) = kind.command();
    debug!("Running {} {}", program, args.join(" "));
    let output = match Command::new(program).args(args).current_dir(root).output() {
        Ok(output) => output,
        Err(e) => {
            warn!("Could not run {}: {}", program, e);
            return TestRun::mock_unit();
        }
    };
    if !output.status.success() {
        warn!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return TestRun::mock_unit();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    kind.parse(&stdout).unwrap_or_else(|| {
        warn!("Could not parse {} output, using mock unit test data", program);
        TestRun::mock_unit()
    })
}

/// Files under `tests` whose names mark them as integration or end-to-end tests
#[must_use]
pub fn integration_test_files(tests: &Path) -> Vec<PathBuf> {
    WalkDir::new(tests)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && resolver::is_integration_name(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn interpreter(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "js" | "mjs" => Some("node"),
        "py" => Some("python3"),
        _ => None,
    }
}

/// Execute each integration test file with its interpreter
#[must_use]
pub fn run_integration_tests(tests: &Path) -> TestRun {
    let files = integration_test_files(tests);
    if files.is_empty() {
        info!("No integration test files, using mock integration data");
        return TestRun::mock_integration();
    }

    let mut passed = 0;
    for file in &files {
        let ok = interpreter(file).is_some_and(|program| {
            Command::new(program)
                .arg(file)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        });
        if ok {
            passed += 1;
        } else {
            debug!("Integration test failed: {}", file.display());
        }
    }
    TestRun::measured(files.len(), passed, files.len() - passed, 0.0)
}

/// Per-identifier coverage from test file contents
#[must_use]
pub fn fr_coverage(mentions: &TestMentions) -> BTreeMap<String, FrCoverage> {
    mentions
        .by_fr
        .iter()
        .map(|(id, files)| {
            (
                id.clone(),
                FrCoverage { test_files: files.clone(), status: "covered".into() },
            )
        })
        .collect()
}

/// Per source module: code files and test files naming it
#[must_use]
pub fn module_coverage(src: &Path, tests: &Path, extensions: &[String]) -> Vec<ModuleCoverage> {
    let Ok(entries) = fs::read_dir(src) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let test_paths: Vec<String> = WalkDir::new(tests)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_string_lossy().to_lowercase())
        .collect();

    dirs.into_iter()
        .map(|dir| {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let code_files = WalkDir::new(&dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
                .count();
            let needle = name.to_lowercase();
            let test_files = test_paths.iter().filter(|p| p.contains(&needle)).count();
            let status = if code_files > 0 && test_files > 0 { "covered" } else { "missing" };
            ModuleCoverage { name, code_files, test_files, status: status.into() }
        })
        .collect()
}

/// Full coverage collection for a project
pub fn collect(
    root: &Path,
    src: &Path,
    tests: &Path,
    extensions: &[String],
) -> Result<CoverageReport, globset::Error> {
    let globs = resolver::test_file_globs()?;
    let mentions = TestMentions::collect(tests, &globs);
    let (unit_tests, integration_tests) = if tests.is_dir() {
        (run_unit_tests(root), run_integration_tests(tests))
    } else {
        info!("Tests directory {} does not exist", tests.display());
        (TestRun::measured(0, 0, 0, 0.0), TestRun::measured(0, 0, 0, 0.0))
    };

    Ok(CoverageReport {
        unit_tests,
        integration_tests,
        modules: module_coverage(src, tests, extensions),
        fr_coverage: fr_coverage(&mentions),
    })
}
