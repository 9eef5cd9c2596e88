// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Report rendering - JSON and Markdown
//!
//! Everything that ends up between tracking-document markers is rendered
//! without timestamps, so identical input yields byte-identical output.

use crate::consistency::{ConsistencyReport, TARGET_COVERAGE};
use crate::issues::IssueReport;
use crate::modules::{ModuleStatus, ModuleTotals};
use crate::scoring::percent;
use crate::types::{Report, Status, StatusCounts};
use crate::validate::ValidationReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Week-one milestone for passing PRD documents
pub const MILESTONE_TARGET: usize = 45;

/// Daily reports listed in a weekly summary
pub const WEEKLY_WINDOW: usize = 7;

/// Marker problems in a tracking document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    /// Begin marker without an end marker
    #[error("marker {0} has no matching end marker")]
    MissingEnd(String),
    /// End marker without a begin marker
    #[error("marker {0} has no matching begin marker")]
    MissingBegin(String),
    /// End marker before the begin marker
    #[error("end marker precedes begin marker {0}")]
    OutOfOrder(String),
}

/// Pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

/// Replace everything between `begin` and `end` with `body`.
///
/// Without markers the region is appended once. Patching twice with the same
/// body yields the same document.
pub fn patch_region(doc: &str, begin: &str, end: &str, body: &str) -> Result<String, RegionError> {
    let region = format!("{begin}\n{}\n{end}", body.trim_end_matches('\n'));

    match (doc.find(begin), doc.find(end)) {
        (Some(b), Some(e)) if b < e => {
            let tail = &doc[e + end.len()..];
            Ok(format!("{}{}{}", &doc[..b], region, tail))
        }
        (Some(_), Some(_)) => Err(RegionError::OutOfOrder(begin.to_string())),
        (Some(_), None) => Err(RegionError::MissingEnd(begin.to_string())),
        (None, Some(_)) => Err(RegionError::MissingBegin(end.to_string())),
        (None, None) => {
            let mut out = doc.to_string();
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(&region);
            out.push('\n');
            Ok(out)
        }
    }
}

/// SHA-256 of a rendered document, hex encoded
#[must_use]
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn mark(present: bool) -> &'static str {
    if present {
        "✅"
    } else {
        "🔴"
    }
}

/// Leading glyph of a status label
#[must_use]
pub fn glyph(status: Status) -> &'static str {
    status.label().split(' ').next().unwrap_or_default()
}

/// Escape a value for use inside a Markdown table cell
#[must_use]
pub fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn counts_row(name: &str, counts: &StatusCounts, progress: f64) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} | {:.1}% |\n",
        cell(name),
        counts.total,
        counts.completed,
        counts.in_progress,
        counts.draft,
        counts.not_started,
        counts.blocked,
        counts.unparsed,
        progress
    )
}

const COUNTS_HEADER: &str = "| 模組 | 總數 | 完成 | 開發中 | 草稿 | 未開始 | 有問題 | 未解析 | 進度 |\n\
                             |------|------|------|--------|------|--------|--------|--------|------|\n";

/// The tracking matrix: a summary table then one section per module
#[must_use]
pub fn matrix(report: &Report) -> String {
    let mut md = String::from("## 模組進度總覽\n\n");
    md.push_str(COUNTS_HEADER);
    for module in &report.modules {
        md.push_str(&counts_row(&module.dir, &module.counts, module.progress));
    }
    md.push_str(&counts_row("**合計**", &report.totals, report.average_score));

    for module in &report.modules {
        md.push_str(&format!("\n### {} ({} - {})\n\n", module.dir, module.code, module.name));
        if module.units.is_empty() {
            md.push_str("_尚無 PRD 文件_\n");
            continue;
        }
        md.push_str("| FR-ID | 子模組 | PRD 狀態 | 實作 | 單元測試 | 整合測試 | Issues | 分數 |\n");
        md.push_str("|-------|--------|----------|------|----------|----------|--------|------|\n");
        for row in &module.units {
            let abbr = if row.module_abbr.is_empty() { "-" } else { &row.module_abbr };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                cell(&row.fr_id),
                cell(abbr),
                cell(&row.status_tag),
                glyph(row.implementation),
                mark(row.has_unit_test),
                mark(row.has_integration_test),
                row.open_issues,
                row.score
            ));
        }
    }
    md
}

/// Overall statistics block for the tracking document
#[must_use]
pub fn stats(report: &Report) -> String {
    let t = &report.totals;
    let mut md = String::from("## 整體統計\n\n");
    md.push_str(&format!("- **模組數**: {}\n", report.modules.len()));
    md.push_str(&format!("- **PRD 文件數**: {}\n", t.total));
    for status in Status::ALL {
        md.push_str(&format!(
            "- **{}**: {} ({:.1}%)\n",
            status.label(),
            t.get(status),
            percent(t.get(status), t.total)
        ));
    }
    md.push_str(&format!("- **未解析**: {}\n", t.unparsed));
    md.push_str(&format!("- **整體進度**: {:.1}%\n", report.overall_progress));
    md.push_str(&format!("- **平均分數**: {:.1}/100\n", report.average_score));
    md
}

/// One module in `statistics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStatistics {
    /// Module directory
    pub dir: String,
    /// Module code
    pub code: String,
    /// Display name
    pub name: String,
    /// Documents
    pub units: usize,
    /// Completed documents
    pub completed: usize,
    /// Mean unit score
    pub progress: f64,
}

/// Dashboard statistics, written as `statistics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Modules
    pub total_modules: usize,
    /// Documents
    pub total_units: usize,
    /// Status-weighted progress
    pub overall_progress: f64,
    /// Mean unit score
    pub average_score: f64,
    /// Global tally
    pub counts: StatusCounts,
    /// Per module
    pub modules: Vec<ModuleStatistics>,
}

impl Statistics {
    /// Derive from a report
    #[must_use]
    pub fn from_report(report: &Report) -> Self {
        Self {
            generated_at: report.generated_at,
            total_modules: report.modules.len(),
            total_units: report.totals.total,
            overall_progress: report.overall_progress,
            average_score: report.average_score,
            counts: report.totals,
            modules: report
                .modules
                .iter()
                .map(|m| ModuleStatistics {
                    dir: m.dir.clone(),
                    code: m.code.clone(),
                    name: m.name.clone(),
                    units: m.counts.total,
                    completed: m.counts.completed,
                    progress: m.progress,
                })
                .collect(),
        }
    }
}

/// `dashboard_summary.md`
#[must_use]
pub fn dashboard(report: &Report, issues: &IssueReport) -> String {
    let mut md = String::from("# PRD 進度儀表板\n\n");
    md.push_str(&format!(
        "**生成時間**: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&stats(report));

    md.push_str("\n## 模組進度\n\n");
    md.push_str("| 模組 | 名稱 | 文件數 | 完成 | 進度 |\n");
    md.push_str("|------|------|--------|------|------|\n");
    for m in &report.modules {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}% |\n",
            cell(&m.code),
            cell(&m.name),
            m.counts.total, m.counts.completed, m.progress
        ));
    }

    md.push_str("\n## Issues\n\n");
    let source = if issues.is_mock() { " (模擬數據)" } else { "" };
    md.push_str(&format!("- **總數**: {}{}\n", issues.total_issues, source));
    md.push_str(&format!("- **開啟**: {}\n", issues.open_issues));
    md.push_str(&format!("- **關閉**: {}\n", issues.closed_issues));
    md.push_str(&format!("- **關聯 FR-ID**: {}\n", issues.issues_by_fr.len()));
    md.push_str(&format!("\n矩陣摘要: `{}`\n", report.matrix_digest));
    md
}

/// Markdown validation report
#[must_use]
pub fn validation(report: &ValidationReport) -> String {
    let s = &report.summary;
    let mut md = String::from("# PRD品質驗證報告\n");
    md.push_str(&format!("\n**驗證時間**: {}\n", report.timestamp.to_rfc3339()));
    md.push_str("\n## 📊 總體統計\n\n");
    md.push_str(&format!("- **檢查檔案數**: {}\n", s.total_files));
    md.push_str(&format!(
        "- **通過檔案數**: {} ({:.1}%)\n",
        s.passed_files,
        percent(s.passed_files, s.total_files)
    ));
    md.push_str(&format!("- **失敗檔案數**: {}\n", s.failed_files));
    md.push_str(&format!("- **平均分數**: {:.1}/100\n", s.average_score));

    if !report.errors_by_type.is_empty() {
        md.push_str("\n## ❌ 錯誤類型分析\n");
        for (check, files) in &report.errors_by_type {
            md.push_str(&format!("\n### {}\n受影響檔案數: {}\n", check.name(), files.len()));
            for file in files.iter().take(5) {
                md.push_str(&format!("- {}\n", file.display()));
            }
            if files.len() > 5 {
                md.push_str(&format!("- ...還有{}個檔案\n", files.len() - 5));
            }
        }
    }

    let failed: Vec<_> = report.files.iter().filter(|f| !f.passed()).collect();
    if !failed.is_empty() {
        md.push_str("\n## 📝 需要修正的檔案\n");
        for file in failed.iter().take(10) {
            md.push_str(&format!("\n#### {}\n", file.file.display()));
            md.push_str(&format!("- **分數**: {:.1}/100\n", file.score));
            for error in &file.errors {
                md.push_str(&format!("- {error}\n"));
            }
            for (check, outcome) in file.failed_checks() {
                md.push_str(&format!("  - ❌ {}\n", check.name()));
                if !outcome.problems.is_empty() {
                    md.push_str(&format!("    - {}\n", outcome.problems.join(", ")));
                }
            }
        }
    }

    if !report.recommendations.is_empty() {
        md.push_str("\n## 💡 改進建議\n\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            md.push_str(&format!("{}. {}\n", i + 1, rec));
        }
    }

    let passed: Vec<_> = report.files.iter().filter(|f| f.passed()).collect();
    if !passed.is_empty() {
        md.push_str(&format!("\n## ✅ 合格檔案 ({}個)\n\n", passed.len()));
        for file in passed.iter().take(20) {
            md.push_str(&format!("- {}\n", file.file.display()));
        }
    }
    md
}

/// Markdown consistency report
#[must_use]
pub fn consistency(report: &ConsistencyReport) -> String {
    let mut md = String::from("## 🔍 FR-ID 與測試一致性驗證報告\n\n");
    md.push_str("### 📊 總體統計\n");
    md.push_str(&format!("- **總 FR-ID 數量**: {}\n", report.total_fr_ids));
    md.push_str(&format!("- **已測試 FR-ID**: {}\n", report.tested_fr_ids));
    md.push_str(&format!("- **未測試 FR-ID**: {}\n", report.untested_fr_ids.len()));
    md.push_str(&format!("- **測試覆蓋率**: {:.1}%\n\n", report.coverage_percentage));
    md.push_str(&format!("### 📈 覆蓋率評估: {}\n\n", report.rating.label()));

    if !report.untested_fr_ids.is_empty() {
        md.push_str("### ❌ 未測試的 FR-ID\n");
        for id in &report.untested_fr_ids {
            md.push_str(&format!("- {id}\n"));
        }
        md.push('\n');
    }

    md.push_str("### 💡 建議\n");
    if report.untested_fr_ids.is_empty() {
        md.push_str("✅ 所有 FR-ID 都有對應的測試檔案\n");
    } else {
        md.push_str("1. **創建缺失的測試檔案**\n");
        for id in report.untested_fr_ids.iter().take(5) {
            md.push_str(&format!("   - 為 {id} 創建測試\n"));
        }
        if report.untested_fr_ids.len() > 5 {
            md.push_str(&format!(
                "   - ... 還有 {} 個需要處理\n",
                report.untested_fr_ids.len() - 5
            ));
        }
    }
    md.push_str("\n2. **提高測試覆蓋率**\n");
    if report.coverage_percentage < TARGET_COVERAGE {
        md.push_str(&format!(
            "   - 目標覆蓋率: {:.0}% (當前: {:.1}%)\n",
            TARGET_COVERAGE, report.coverage_percentage
        ));
        md.push_str(&format!(
            "   - 需要增加 {:.1}% 的覆蓋率\n",
            TARGET_COVERAGE - report.coverage_percentage
        ));
    } else {
        md.push_str("   - 測試覆蓋率已達到目標\n");
    }
    md
}

/// Module status table for the tracking document
#[must_use]
pub fn module_table(statuses: &[ModuleStatus]) -> String {
    let mut md = String::from("## 模組上線狀態\n\n");
    md.push_str("| 模組 | 名稱 | 舊系統 | 新系統 | PRD | 系統整合 | 單元測試 | 整合測試 | Issues | 上線進度 |\n");
    md.push_str("|------|------|--------|--------|-----|----------|----------|----------|--------|----------|\n");
    for s in statuses {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {}% |\n",
            cell(&s.code),
            cell(&s.name),
            mark(s.legacy_system),
            glyph(s.implementation),
            glyph(s.prd),
            glyph(s.system_integration),
            glyph(s.unit_test),
            glyph(s.integration_test),
            s.open_issues,
            s.progress
        ));
    }
    md.push('\n');
    md.push_str(&module_totals(&ModuleTotals::from_statuses(statuses)));
    md
}

fn module_totals(t: &ModuleTotals) -> String {
    let line = |label: &str, n: usize| {
        format!("- **{}**: {}/{} ({:.0}%)\n", label, n, t.modules, percent(n, t.modules))
    };
    let mut md = String::from("### 總體進度統計\n\n");
    md.push_str(&line("有舊系統運行", t.legacy_systems));
    md.push_str(&line("新系統開發中", t.implementation_started));
    md.push_str(&line("PRD 已完成或進行中", t.prd_started));
    md.push_str(&line("已開始整合", t.integration_started));
    md.push_str(&line("單元測試完成", t.unit_tested));
    md.push_str(&line("整合測試完成", t.integration_tested));
    md.push_str(&format!("- **平均上線進度**: {:.0}%\n", t.average_progress));
    md
}

/// `module_status_report.md`
#[must_use]
pub fn module_report(statuses: &[ModuleStatus], generated_at: DateTime<Utc>) -> String {
    let mut md = String::from("# 模組狀態檢測報告\n");
    md.push_str(&format!("生成時間：{}\n\n## 檢測結果摘要\n", generated_at.format("%Y-%m-%d %H:%M:%S")));
    for s in statuses {
        md.push_str(&format!("\n### {} - {}\n", s.code, s.name));
        md.push_str(&format!("- 舊系統: {}\n", mark(s.legacy_system)));
        md.push_str(&format!("- 新系統: {}\n", glyph(s.implementation)));
        md.push_str(&format!("- PRD: {}\n", glyph(s.prd)));
        md.push_str(&format!("- 整合: {}\n", glyph(s.system_integration)));
        md.push_str(&format!("- 單元測試: {}\n", glyph(s.unit_test)));
        md.push_str(&format!("- 整合測試: {}\n", glyph(s.integration_test)));
        md.push_str(&format!("- 上線進度: {}%\n", s.progress));
    }
    md
}

/// Daily quality report built from a validation run
#[must_use]
pub fn daily_report(report: &ValidationReport, date: NaiveDate) -> String {
    let s = &report.summary;
    let mut md = format!("# PRD品質日報 - {}\n\n", date.format("%Y-%m-%d"));
    md.push_str("## 📊 總體統計\n");
    md.push_str(&format!("- **已檢查PRD數**: {}\n", s.total_files));
    md.push_str(&format!("- **格式合格數**: {}\n", s.passed_files));
    md.push_str(&format!("- **需修正數**: {}\n", s.failed_files));
    md.push_str(&format!("- **平均品質分數**: {:.1}/100\n", s.average_score));

    let module_of = |path: &Path| {
        path.parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    if s.passed_files > 0 {
        md.push_str("\n### ✅ 合格模組\n");
        for file in report.files.iter().filter(|f| f.passed()) {
            md.push_str(&format!("- {}\n", module_of(&file.file)));
        }
    }
    if s.failed_files > 0 {
        md.push_str("\n### 🔴 需要修正\n");
        for file in report.files.iter().filter(|f| !f.passed()) {
            md.push_str(&format!("- {}: {:.0}分\n", module_of(&file.file), file.score));
            for (check, _) in file.failed_checks() {
                md.push_str(&format!("  - ❌ {}\n", check.name()));
            }
        }
    }

    if !report.errors_by_type.is_empty() {
        md.push_str("\n## ❌ 常見問題\n");
        for (check, files) in &report.errors_by_type {
            md.push_str(&format!("- **{}**: {}個檔案\n", check.name(), files.len()));
        }
    }
    if !report.recommendations.is_empty() {
        md.push_str("\n## 💡 改進建議\n");
        for rec in &report.recommendations {
            md.push_str(&format!("- {rec}\n"));
        }
    }

    md.push_str("\n## 🎯 里程碑追蹤\n");
    md.push_str(&format!("- **目標**: {MILESTONE_TARGET}個子模組\n"));
    md.push_str(&format!("- **當前進度**: {}/{}\n", s.passed_files, MILESTONE_TARGET));
    let progress = percent(s.passed_files, MILESTONE_TARGET);
    let state = if progress < 20.0 {
        "⚠️ 進度落後，需要加速"
    } else if progress < 80.0 {
        "🟡 正常進行中"
    } else {
        "✅ 進度良好"
    };
    md.push_str(&format!("- **狀態**: {state}\n"));
    md
}

/// File name of the daily report for a date
#[must_use]
pub fn daily_report_name(date: NaiveDate) -> String {
    format!("daily_report_{}.md", date.format("%Y%m%d"))
}

/// File name of the weekly summary for a date's ISO week
#[must_use]
pub fn weekly_report_name(date: NaiveDate) -> String {
    format!("weekly_report_week{}.md", date.iso_week().week())
}

/// Weekly summary linking the most recent daily reports
#[must_use]
pub fn weekly_report(daily_reports: &[PathBuf], date: NaiveDate) -> String {
    let week = date.iso_week().week();
    let mut md = format!("# PRD品質週報 - Week {week}\n");
    md.push_str(&format!("**期間**: {} (Week {})\n\n", date.format("%Y-%m-%d"), week));
    md.push_str("## 📈 每日進度\n");

    let mut names: Vec<String> = daily_reports
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|n| n.starts_with("daily_report_"))
        .collect();
    names.sort();
    let skip = names.len().saturating_sub(WEEKLY_WINDOW);
    for name in names.into_iter().skip(skip) {
        let day = name.trim_start_matches("daily_report_").trim_end_matches(".md");
        md.push_str(&format!("- **{day}**: 查看[日報]({name})\n"));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MATRIX_BEGIN, MATRIX_END};

    #[test]
    fn patch_appends_then_replaces() {
        let doc = "# Tracking\n\nintro";
        let once = patch_region(doc, MATRIX_BEGIN, MATRIX_END, "body v1\n").unwrap();
        assert!(once.starts_with("# Tracking\n\nintro\n\n"));
        assert_eq!(once.matches(MATRIX_BEGIN).count(), 1);

        let twice = patch_region(&once, MATRIX_BEGIN, MATRIX_END, "body v1\n").unwrap();
        assert_eq!(once, twice);

        let updated = patch_region(&once, MATRIX_BEGIN, MATRIX_END, "body v2").unwrap();
        assert!(updated.contains("body v2"));
        assert!(!updated.contains("body v1"));
        assert!(updated.starts_with("# Tracking"));
    }

    #[test]
    fn patch_keeps_surrounding_text() {
        let doc = format!("head\n{MATRIX_BEGIN}\nold\n{MATRIX_END}\ntail\n");
        let out = patch_region(&doc, MATRIX_BEGIN, MATRIX_END, "new").unwrap();
        assert_eq!(out, format!("head\n{MATRIX_BEGIN}\nnew\n{MATRIX_END}\ntail\n"));
    }

    #[test]
    fn unbalanced_markers_are_errors() {
        let only_begin = format!("{MATRIX_BEGIN}\nx");
        assert_eq!(
            patch_region(&only_begin, MATRIX_BEGIN, MATRIX_END, "b"),
            Err(RegionError::MissingEnd(MATRIX_BEGIN.into()))
        );
        let reversed = format!("{MATRIX_END}\n{MATRIX_BEGIN}");
        assert!(matches!(
            patch_region(&reversed, MATRIX_BEGIN, MATRIX_END, "b"),
            Err(RegionError::OutOfOrder(_))
        ));
    }

    #[test]
    fn digest_is_stable_hex() {
        let d = digest("matrix");
        assert_eq!(d.len(), 64);
        assert_eq!(d, digest("matrix"));
        assert_ne!(d, digest("matrix "));
    }

    #[test]
    fn weekly_lists_last_seven() {
        let files: Vec<PathBuf> = (1..=9)
            .map(|d| PathBuf::from(format!("daily_report_202501{d:02}.md")))
            .chain(std::iter::once(PathBuf::from("latest_report.md")))
            .collect();
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let md = weekly_report(&files, date);
        assert!(md.contains("Week 2"));
        assert!(!md.contains("20250102"));
        assert!(md.contains("20250103"));
        assert!(md.contains("20250109"));
        assert!(!md.contains("latest_report"));
        assert_eq!(weekly_report_name(date), "weekly_report_week2.md");
        assert_eq!(daily_report_name(date), "daily_report_20250109.md");
    }

    #[test]
    fn table_cells_escape_pipes() {
        assert_eq!(cell("✅ 完成 | v2"), "✅ 完成 \\| v2");
        assert_eq!(cell("two\nlines"), "two lines");

        let row = counts_row("A|B", &StatusCounts::default(), 0.0);
        let separators = row.match_indices('|').filter(|(i, _)| !row[..*i].ends_with('\\')).count();
        assert_eq!(separators, 10);
        assert!(row.starts_with("| A\\|B |"));
    }

    #[test]
    fn glyphs() {
        assert_eq!(glyph(Status::Completed), "✅");
        assert_eq!(glyph(Status::NotStarted), "🔴");
        assert_eq!(glyph(Status::Blocked), "⚠️");
    }
}
