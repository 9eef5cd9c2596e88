// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pattern schema for PRD documents
//!
//! Every pattern the tracker matches against Markdown or source text lives
//! here. When the document format drifts, bump [`SCHEMA_VERSION`] and change
//! the table in one place.

use once_cell::sync::Lazy;
use regex::Regex;

/// Version of the pattern table below
pub const SCHEMA_VERSION: u32 = 1;

/// Status tag assumed when a document carries none
pub const DEFAULT_STATUS_TAG: &str = "🔴 未開始";

/// Status glyph labels recognised in free text
pub const STATUS_GLYPHS: [&str; 5] = ["📝 草稿", "✅ 完成", "🟡 開發中", "🔴 未開始", "⚠️ 有問題"];

/// Labels the validator accepts in a `**狀態**` field
pub const VALID_STATUS_FIELDS: [&str; 4] = ["🔴 未開始", "🟡 開發中", "✅ 完成", "⚪ 規劃中"];

/// File-name fragments excluded from scanning (compared case-insensitively)
pub const EXCLUDED_NAME_FRAGMENTS: [&str; 2] = ["readme", "template"];

/// Begin marker of the generated matrix region in the tracking document
pub const MATRIX_BEGIN: &str = "<!-- prdtrack:matrix:begin -->";
/// End marker of the generated matrix region
pub const MATRIX_END: &str = "<!-- prdtrack:matrix:end -->";
/// Begin marker of the generated statistics region
pub const STATS_BEGIN: &str = "<!-- prdtrack:stats:begin -->";
/// End marker of the generated statistics region
pub const STATS_END: &str = "<!-- prdtrack:stats:end -->";
/// Begin marker of the module status region
pub const MODULES_BEGIN: &str = "<!-- prdtrack:modules:begin -->";
/// End marker of the module status region
pub const MODULES_END: &str = "<!-- prdtrack:modules:end -->";

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

/// Any requirement identifier, simple (`FR-001`) or namespaced (`FR-CRM-CM-001`)
pub static FR_ID: Lazy<Regex> =
    Lazy::new(|| compile(r"FR-(?:[A-Z]{2,4}(?:-[A-Z]{2,5})*-)?\d{3}"));

/// Simple identifiers only
pub static FR_ID_SIMPLE: Lazy<Regex> = Lazy::new(|| compile(r"FR-\d{3}"));

/// Whole-string namespaced identifier, as required in PRD headings
pub static FR_ID_NAMESPACED: Lazy<Regex> =
    Lazy::new(|| compile(r"^FR-[A-Z]{2,4}(-[A-Z]{2,5})*-\d{3}$"));

/// Requirement heading (`## FR-...` or `### FR-...`)
pub static FR_HEADING: Lazy<Regex> = Lazy::new(|| compile(r"(?m)###?\s*(FR-[A-Z0-9-]+)"));

/// Explicit status field, e.g. `**狀態**: 🟡 開發中`
pub static STATUS_FIELD: Lazy<Regex> = Lazy::new(|| compile(r"(?m)\*\*狀態\*\*\s*[:：]\s*([^\n]+)"));

/// One of the five status glyph labels
pub static STATUS_GLYPH: Lazy<Regex> =
    Lazy::new(|| compile(r"(📝 草稿|✅ 完成|🟡 開發中|🔴 未開始|⚠️ 有問題)"));

/// Submodule abbreviation in square brackets, e.g. `[CRM-CM]`
pub static MODULE_ABBR: Lazy<Regex> = Lazy::new(|| compile(r"\[([A-Z]{2,3}-[A-Z]{2,3})\]"));

/// Semantic version as required in module info
pub static VERSION: Lazy<Regex> = Lazy::new(|| compile(r"^v\d+\.\d+\.\d+$"));

/// API endpoint definition
pub static API_ENDPOINT: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)(GET|POST|PUT|DELETE|PATCH)\s+/api/v\d+/"));

/// TypeScript interface declaration
pub static TS_INTERFACE: Lazy<Regex> = Lazy::new(|| compile(r"(?m)interface\s+\w+\s*\{"));

/// SQL table definition
pub static SQL_CREATE_TABLE: Lazy<Regex> = Lazy::new(|| compile(r"(?im)CREATE\s+TABLE\s+\w+"));

/// Acceptance-criteria fenced YAML block
pub static ACCEPTANCE_BLOCK: Lazy<Regex> =
    Lazy::new(|| compile(r"(?s)\*\*驗收標準\*\*.*?```yaml(.*?)```"));

/// Passed count on a pytest summary line
pub static PYTEST_PASSED: Lazy<Regex> = Lazy::new(|| compile(r"(\d+) passed"));

/// Failed count on a pytest summary line
pub static PYTEST_FAILED: Lazy<Regex> = Lazy::new(|| compile(r"(\d+) failed"));

/// Percentage on a coverage TOTAL line
pub static PERCENT: Lazy<Regex> = Lazy::new(|| compile(r"(\d+)%"));

/// Maven surefire summary line
pub static MAVEN_SUMMARY: Lazy<Regex> = Lazy::new(|| compile(r"Tests run: (\d+), Failures: (\d+)"));

/// `- **<field>**: value` line for a labelled field
#[must_use]
pub fn labelled_field(field: &str) -> Regex {
    compile(&format!(r"(?m)[-*]\s*\*\*{}\*\*\s*[:：]\s*(.+)", regex::escape(field)))
}

/// Presence of a `- **<field>**:` line, value optional
#[must_use]
pub fn labelled_field_marker(field: &str) -> Regex {
    compile(&format!(r"(?m)[-*]\s*\*\*{}\*\*\s*[:：]", regex::escape(field)))
}

/// First requirement identifier in `content`
#[must_use]
pub fn first_fr_id(content: &str) -> Option<String> {
    FR_ID.find(content).map(|m| m.as_str().to_string())
}

/// Every distinct requirement identifier in `content`, in first-seen order
#[must_use]
pub fn all_fr_ids(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in FR_ID.find_iter(content) {
        let id = m.as_str();
        if !seen.iter().any(|s: &String| s == id) {
            seen.push(id.to_string());
        }
    }
    seen
}

/// First status tag in `content`.
///
/// An explicit `**狀態**:` field wins over any glyph, even one earlier in the
/// document, so a status legend above the field is ignored and free-form
/// values such as `🟢 已完成並上線` are read. Without a field the first glyph
/// label is taken.
#[must_use]
pub fn first_status_tag(content: &str) -> Option<String> {
    if let Some(caps) = STATUS_FIELD.captures(content) {
        return Some(caps[1].trim().to_string());
    }
    STATUS_GLYPH.find(content).map(|m| m.as_str().to_string())
}

/// First submodule abbreviation in `content`
#[must_use]
pub fn first_module_abbr(content: &str) -> Option<String> {
    MODULE_ABBR.captures(content).map(|c| c[1].to_string())
}

/// Whether a file name is excluded from scanning
#[must_use]
pub fn is_excluded_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    EXCLUDED_NAME_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Module code embedded in a PRD directory name.
///
/// `02-CRM-Customer_Relationship_Management` yields `CRM`; a name without a
/// numeric prefix yields its first dash-separated segment.
#[must_use]
pub fn module_code_from_dir(dir_name: &str) -> String {
    let mut parts = dir_name.split('-');
    let first = parts.next().unwrap_or_default();
    if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit() || c == '.') {
        parts.next().unwrap_or(first).to_string()
    } else {
        first.to_string()
    }
}
