// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cross-reference resolution
//!
//! Heuristic existence checks linking requirement identifiers and module
//! abbreviations to implementation files, test files and issues. Matches
//! are by name containment, so false positives and negatives are expected.

use crate::aggregate::Aggregate;
use crate::schema;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name patterns recognised as test files
pub const TEST_FILE_PATTERNS: [&str; 8] = [
    "*.spec.*",
    "*.test.*",
    "*_test.py",
    "test_*.py",
    "*Test.java",
    "*_test.go",
    "*_test.rs",
    "*_tests.rs",
];

/// Normalise a module abbreviation for directory matching: `CRM-CM` → `crm_cm`
#[must_use]
pub fn normalize_abbr(abbr: &str) -> String {
    abbr.replace('-', "_").to_lowercase()
}

/// One indexed directory and its direct files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDir {
    /// Directory path
    pub path: PathBuf,
    /// Lower-cased directory name
    pub name_lower: String,
    /// Direct child files
    pub files: Vec<PathBuf>,
}

/// Directory index of one tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCorpus {
    /// Root of the tree
    pub root: PathBuf,
    /// Every directory below the root (the root itself excluded)
    pub dirs: Vec<IndexedDir>,
}

impl FileCorpus {
    /// Index a tree; a missing root yields an empty corpus
    #[must_use]
    pub fn index(root: &Path) -> Self {
        let mut dirs = Vec::new();
        if !root.is_dir() {
            debug!("Corpus root {} does not exist", root.display());
            return Self { root: root.to_path_buf(), dirs };
        }

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let mut files: Vec<PathBuf> = fs::read_dir(entry.path())
                .map(|rd| {
                    rd.filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_file())
                        .collect()
                })
                .unwrap_or_default();
            files.sort();
            dirs.push(IndexedDir {
                name_lower: entry.file_name().to_string_lossy().to_lowercase(),
                path: entry.into_path(),
                files,
            });
        }
        Self { root: root.to_path_buf(), dirs }
    }

    /// Whether the corpus links to a requirement.
    ///
    /// True when a directory name contains the normalised abbreviation or a
    /// direct file name contains the identifier. Both inputs must be present.
    #[must_use]
    pub fn matches(&self, abbr: &str, fr_id: &str) -> bool {
        if abbr.is_empty() || fr_id.is_empty() {
            return false;
        }
        let needle = normalize_abbr(abbr);
        self.dirs.iter().any(|dir| {
            dir.name_lower.contains(&needle) || dir.files.iter().any(|f| file_name_contains(f, fr_id))
        })
    }

    /// Files linked to a requirement, optionally filtered by extension
    #[must_use]
    pub fn matching_files(&self, abbr: &str, fr_id: &str, extensions: &[String]) -> Vec<PathBuf> {
        if abbr.is_empty() || fr_id.is_empty() {
            return Vec::new();
        }
        let needle = normalize_abbr(abbr);
        let mut found = Vec::new();
        for dir in &self.dirs {
            if dir.name_lower.contains(&needle) {
                found.extend(dir.files.iter().filter(|f| has_extension(f, extensions)).cloned());
            }
            found.extend(dir.files.iter().filter(|f| file_name_contains(f, fr_id)).cloned());
        }
        found.sort();
        found.dedup();
        found
    }

    /// Files whose name contains `fragment` (case-insensitive), anywhere in the tree
    #[must_use]
    pub fn files_named_like(&self, fragment: &str, extensions: &[String]) -> Vec<PathBuf> {
        let fragment = fragment.to_lowercase();
        let mut found: Vec<PathBuf> = self
            .all_files()
            .filter(|f| {
                f.file_name()
                    .is_some_and(|n| n.to_string_lossy().to_lowercase().contains(&fragment))
            })
            .filter(|f| has_extension(f, extensions))
            .cloned()
            .collect();
        found.sort();
        found
    }

    /// All indexed files
    pub fn all_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.dirs.iter().flat_map(|d| d.files.iter())
    }

    /// Whether the corpus indexed anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

fn file_name_contains(path: &Path, needle: &str) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().contains(needle))
}

/// Whether `path` has one of `extensions`; an empty list accepts everything
#[must_use]
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| extensions.iter().any(|x| x.trim_start_matches('.') == e))
}

/// Compile [`TEST_FILE_PATTERNS`]
pub fn test_file_globs() -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in TEST_FILE_PATTERNS {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

/// Requirement identifiers mentioned inside test files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMentions {
    /// Identifier → test files mentioning it
    pub by_fr: BTreeMap<String, Vec<PathBuf>>,
    /// Number of test files read
    pub files_scanned: usize,
}

impl TestMentions {
    /// Read every test file below `root` and record the identifiers it mentions
    #[must_use]
    pub fn collect(root: &Path, globs: &GlobSet) -> Self {
        let mut mentions = Self::default();
        if !root.is_dir() {
            return mentions;
        }
        for entry in WalkDir::new(root).sort_by_file_name().into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() || !globs.is_match(entry.file_name()) {
                continue;
            }
            let content = match fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to read test file {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            mentions.files_scanned += 1;
            for id in schema::all_fr_ids(&content) {
                mentions
                    .by_fr
                    .entry(id)
                    .or_default()
                    .push(entry.path().to_path_buf());
            }
        }
        mentions
    }

    /// Whether any test file mentions the identifier
    #[must_use]
    pub fn mentions(&self, fr_id: &str) -> bool {
        self.by_fr.contains_key(fr_id)
    }

    /// Test files mentioning the identifier
    #[must_use]
    pub fn files_for(&self, fr_id: &str) -> &[PathBuf] {
        self.by_fr.get(fr_id).map_or(&[], Vec::as_slice)
    }
}

/// All corpora needed to cross-reference a scan
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    /// Implementation sources
    pub implementation: FileCorpus,
    /// `tests/unit`
    pub unit_tests: FileCorpus,
    /// `tests/integration`
    pub integration_tests: FileCorpus,
    /// Identifier mentions across the whole tests tree
    pub mentions: TestMentions,
    /// Extensions counted as code
    pub code_extensions: Vec<String>,
}

/// Cross-reference of one requirement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Implementation files that matched
    pub implementation_files: Vec<PathBuf>,
    /// Implementation matched by name heuristics
    pub has_implementation: bool,
    /// Unit test presence
    pub has_unit_test: bool,
    /// Integration test presence
    pub has_integration_test: bool,
    /// Test files mentioning the identifier in their content
    pub test_files: Vec<PathBuf>,
}

impl Resolver {
    /// Index the source and test trees
    pub fn build(src: &Path, tests: &Path, code_extensions: Vec<String>) -> Result<Self, globset::Error> {
        let globs = test_file_globs()?;
        Ok(Self {
            implementation: FileCorpus::index(src),
            unit_tests: FileCorpus::index(&tests.join("unit")),
            integration_tests: FileCorpus::index(&tests.join("integration")),
            mentions: TestMentions::collect(tests, &globs),
            code_extensions,
        })
    }

    /// Resolve one requirement
    #[must_use]
    pub fn resolve(&self, abbr: &str, fr_id: &str) -> CrossReference {
        let in_unit_tree = self.unit_tests.matches(abbr, fr_id)
            || self.mentions.files_for(fr_id).iter().any(|f| f.starts_with(&self.unit_tests.root));
        let in_integration_tree = self.integration_tests.matches(abbr, fr_id)
            || self
                .mentions
                .files_for(fr_id)
                .iter()
                .any(|f| f.starts_with(&self.integration_tests.root) || is_integration_name(f));

        CrossReference {
            implementation_files: self
                .implementation
                .matching_files(abbr, fr_id, &self.code_extensions),
            has_implementation: self.implementation.matches(abbr, fr_id),
            has_unit_test: in_unit_tree,
            has_integration_test: in_integration_tree,
            test_files: self.mentions.files_for(fr_id).to_vec(),
        }
    }
}

/// Whether a test file name marks it as an integration or end-to-end test
#[must_use]
pub fn is_integration_name(path: &Path) -> bool {
    path.file_name().is_some_and(|n| {
        let n = n.to_string_lossy().to_lowercase();
        n.contains("integration") || n.contains("e2e")
    })
}

/// Code presence for one scanned document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCode {
    /// Source document
    pub file_path: PathBuf,
    /// Requirement identifier
    pub fr_id: Option<String>,
    /// Submodule abbreviation
    pub module_abbr: String,
    /// Matched by name heuristics
    pub has_code: bool,
    /// Matching code files
    pub code_files: Vec<PathBuf>,
}

/// Code presence for one PRD module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCode {
    /// Module directory name
    pub name: String,
    /// `src/<module dir>` exists
    pub has_code: bool,
    /// Code files below `src/<module dir>`
    pub code_files: Vec<PathBuf>,
    /// Committer date of the last commit touching `src/<module dir>`
    pub last_commit: Option<String>,
    /// Per document
    pub submodules: Vec<UnitCode>,
}

/// Code status report, written as `code_status.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReport {
    /// Per module
    pub modules: Vec<ModuleCode>,
    /// Modules checked
    pub total_modules: usize,
    /// Modules with a source directory
    pub modules_with_code: usize,
    /// Modules without one
    pub modules_without_code: usize,
}

/// Code files below `dir`, recursively
#[must_use]
pub fn code_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Committer date (ISO 8601) of the last commit touching `dir`.
///
/// `None` when git is unavailable, `dir` is outside a repository or has no
/// history.
#[must_use]
pub fn last_commit(dir: &Path) -> Option<String> {
    let cwd = dir.parent().filter(|p| p.is_dir()).unwrap_or(dir);
    let output = match Command::new("git")
        .args(["log", "-1", "--format=%cI", "--"])
        .arg(dir)
        .current_dir(cwd)
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            debug!("git unavailable: {}", e);
            return None;
        }
    };
    if !output.status.success() {
        debug!("git log failed for {}", dir.display());
        return None;
    }
    let date = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!date.is_empty()).then_some(date)
}

/// Check every scanned module and document against the source tree
#[must_use]
pub fn code_status(aggregate: &Aggregate, resolver: &Resolver, src: &Path) -> CodeReport {
    let mut report = CodeReport::default();
    for group in &aggregate.modules {
        let module_src = src.join(&group.name);
        let has_code = module_src.is_dir();
        let submodules = group
            .units
            .iter()
            .map(|unit| {
                let fr_id = unit.fr_id.as_deref().unwrap_or_default();
                UnitCode {
                    file_path: unit.file_path.clone(),
                    fr_id: unit.fr_id.clone(),
                    module_abbr: unit.module_abbr.clone(),
                    has_code: resolver.implementation.matches(&unit.module_abbr, fr_id),
                    code_files: resolver.implementation.matching_files(
                        &unit.module_abbr,
                        fr_id,
                        &resolver.code_extensions,
                    ),
                }
            })
            .collect();

        report.total_modules += 1;
        if has_code {
            report.modules_with_code += 1;
        } else {
            report.modules_without_code += 1;
        }
        report.modules.push(ModuleCode {
            name: group.name.clone(),
            has_code,
            code_files: if has_code {
                code_files(&module_src, &resolver.code_extensions)
            } else {
                Vec::new()
            },
            last_commit: if has_code { last_commit(&module_src) } else { None },
            submodules,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn directory_name_match_normalises_separators() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "modules/Crm_Cm/service.ts", "");
        let corpus = FileCorpus::index(tmp.path());

        assert!(corpus.matches("CRM-CM", "FR-001"));
        assert!(!corpus.matches("WMS-BT", "FR-001"));
        assert!(!corpus.matches("", "FR-001"));
        assert!(!corpus.matches("CRM-CM", ""));
    }

    #[test]
    fn file_name_match_on_identifier() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "misc/FR-042-handler.ts", "");
        touch(tmp.path(), "misc/notes.txt", "");
        let corpus = FileCorpus::index(tmp.path());

        assert!(corpus.matches("XX-YY", "FR-042"));
        let files = corpus.matching_files("XX-YY", "FR-042", &["ts".to_string()]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn root_level_files_are_not_candidates() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "FR-001.ts", "");
        assert!(!FileCorpus::index(tmp.path()).matches("AA-BB", "FR-001"));
    }

    #[test]
    fn test_mentions_by_content() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "unit/pricing.test.ts", "describe('FR-001 pricing', () => {})");
        touch(tmp.path(), "integration/order_integration_test.py", "# covers FR-002");
        touch(tmp.path(), "unit/helpers.ts", "FR-003 is not a test file");

        let resolver = Resolver::build(&tmp.path().join("src"), tmp.path(), vec![]).unwrap();
        let first = resolver.resolve("", "FR-001");
        assert!(first.has_unit_test);
        assert!(!first.has_integration_test);

        let second = resolver.resolve("", "FR-002");
        assert!(second.has_integration_test);
        assert!(!resolver.mentions.mentions("FR-003"));
    }

    #[test]
    fn code_status_per_module() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/02-CRM/crm_cm/service.ts", "");
        touch(tmp.path(), "src/02-CRM/readme.txt", "");
        let units = vec![crate::scanner::parse_document(
            "02-CRM",
            Path::new("PRD/02-CRM/prd.md"),
            "[CRM-CM] FR-001",
        )];
        let mut aggregate = Aggregate::from_units(units);
        aggregate.ensure_module("05-WMS");

        let src = tmp.path().join("src");
        let resolver = Resolver::build(&src, &tmp.path().join("tests"), vec!["ts".into()]).unwrap();
        let report = code_status(&aggregate, &resolver, &src);

        assert_eq!(report.total_modules, 2);
        assert_eq!(report.modules_with_code, 1);
        assert_eq!(report.modules[0].code_files.len(), 1);
        assert!(report.modules[0].submodules[0].has_code);
        assert!(!report.modules[1].has_code);
        assert_eq!(report.modules[1].last_commit, None);
    }

    #[test]
    fn last_commit_outside_repository_is_none() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/02-CRM/service.ts", "");
        assert_eq!(last_commit(&tmp.path().join("src/02-CRM")), None);
        assert_eq!(last_commit(&tmp.path().join("missing")), None);
    }

    #[test]
    fn last_commit_reads_git_history() {
        let tmp = TempDir::new().unwrap();
        let git = |args: &[&str]| {
            Command::new("git")
                .args(["-c", "user.name=prdtrack", "-c", "user.email=prdtrack@example.invalid"])
                .args(["-c", "commit.gpgsign=false"])
                .args(args)
                .current_dir(tmp.path())
                .output()
                .is_ok_and(|o| o.status.success())
        };
        if !git(&["init", "-q"]) {
            return;
        }
        touch(tmp.path(), "src/02-CRM/service.ts", "");
        touch(tmp.path(), "src/05-WMS/.keep", "");
        assert!(git(&["add", "src/02-CRM"]));
        assert!(git(&["commit", "-q", "-m", "crm"]));

        let date = last_commit(&tmp.path().join("src/02-CRM")).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&date).is_ok());
        assert_eq!(last_commit(&tmp.path().join("src/05-WMS")), None);
    }
}
