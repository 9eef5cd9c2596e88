// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! PRD document scanning
//!
//! Walks `PRD/<module>/**/*.md` and turns every document into a [`Unit`].
//! A document that cannot be read is logged and skipped; it never aborts
//! the scan.

use crate::schema;
use crate::types::{Status, Unit};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Scanner over one PRD root
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a scanner for a PRD root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The PRD root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Module directories directly below the root, sorted by name
    #[must_use]
    pub fn module_dirs(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("PRD directory {} is not readable: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    /// Every unit below the root, lazily, module by module
    pub fn units(&self) -> impl Iterator<Item = Unit> {
        self.module_dirs()
            .into_iter()
            .flat_map(|dir| module_units(&dir))
    }

    /// Markdown documents below the root that are not excluded by name
    pub fn documents(&self) -> impl Iterator<Item = PathBuf> {
        self.module_dirs()
            .into_iter()
            .flat_map(|dir| markdown_files(&dir))
    }
}

/// Directory name used as the module key
#[must_use]
pub fn module_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_markdown(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn markdown_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(is_markdown)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            let excluded = schema::is_excluded_name(&name);
            if excluded {
                debug!("Excluded by name: {}", entry.path().display());
            }
            !excluded
        })
        .map(DirEntry::into_path)
}

/// Units of one module directory, lazily
pub fn module_units(dir: &Path) -> impl Iterator<Item = Unit> {
    let module = module_name(dir);
    markdown_files(dir).filter_map(move |path| read_unit(&module, &path))
}

/// Read and parse one document; I/O and decode errors are logged and yield `None`
#[must_use]
pub fn read_unit(module: &str, path: &Path) -> Option<Unit> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    let mut unit = parse_document(module, path, &content);
    unit.last_modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);
    Some(unit)
}

/// Extract a unit from document text.
///
/// Identifier, status tag and module abbreviation each take the first
/// match in the whole document.
#[must_use]
pub fn parse_document(module: &str, path: &Path, content: &str) -> Unit {
    let fr_id = schema::first_fr_id(content);
    let status_tag =
        schema::first_status_tag(content).unwrap_or_else(|| schema::DEFAULT_STATUS_TAG.to_string());
    let status = Status::classify(&status_tag);
    let module_abbr = schema::first_module_abbr(content).unwrap_or_default();

    if fr_id.is_none() {
        debug!("No requirement identifier in {}", path.display());
    }

    Unit {
        fr_id,
        status_tag,
        status,
        module: module.to_string(),
        module_abbr,
        file_path: path.to_path_buf(),
        last_modified: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn readme_is_excluded() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "02-CRM-Customer/prd.md", "# [CRM-CM]\nFR-001\n✅ 完成\n");
        write(tmp.path(), "02-CRM-Customer/README.md", "FR-999 ✅ 完成");

        let units: Vec<_> = Scanner::new(tmp.path()).units().collect();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].fr_id.as_deref(), Some("FR-001"));
        assert_eq!(units[0].status, Status::Completed);
        assert_eq!(units[0].module_abbr, "CRM-CM");
        assert_eq!(units[0].module, "02-CRM-Customer");
    }

    #[test]
    fn missing_identifier_is_kept_unparsed() {
        let unit = parse_document("m", Path::new("x.md"), "no id here");
        assert!(!unit.is_parsed());
        assert_eq!(unit.status_tag, schema::DEFAULT_STATUS_TAG);
        assert_eq!(unit.status, Status::NotStarted);
    }

    #[test]
    fn root_files_are_not_units() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "PRD_TRACKING_MATRIX.md", "FR-100 ✅ 完成");
        assert_eq!(Scanner::new(tmp.path()).units().count(), 0);
    }

    #[test]
    fn missing_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        let scanner = Scanner::new(tmp.path().join("nope"));
        assert_eq!(scanner.units().count(), 0);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "01-DSH/a.md", "FR-001 ✅ 完成");
        let bad = tmp.path().join("01-DSH/b.md");
        fs::write(&bad, [0xff, 0xfe, 0xfd]).unwrap();

        let units: Vec<_> = Scanner::new(tmp.path()).units().collect();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn traversal_is_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "02-CRM/b.md", "FR-002");
        write(tmp.path(), "02-CRM/a.md", "FR-001");
        write(tmp.path(), "01-DSH/z.md", "FR-003");

        let ids: Vec<_> = Scanner::new(tmp.path())
            .units()
            .filter_map(|u| u.fr_id)
            .collect();
        assert_eq!(ids, vec!["FR-003", "FR-001", "FR-002"]);
    }
}
