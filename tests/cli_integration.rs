// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the prdtrack CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MATRIX_BEGIN: &str = "<!-- prdtrack:matrix:begin -->";
const MODULES_BEGIN: &str = "<!-- prdtrack:modules:begin -->";

// =============================================================================
// Test Helpers
// =============================================================================

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small project: two CRM documents, one empty module, one source file and one test
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "PRD/02-CRM-Customer/cm/prd.md",
        "# [CRM-CM] 客戶管理\n\n### FR-001 客戶資料\n**狀態**: ✅ 完成\n",
    );
    write(
        root,
        "PRD/02-CRM-Customer/pm/prd.md",
        "# [CRM-PM] 價格管理\n\n### FR-002 價格\n📝 草稿\n",
    );
    write(root, "PRD/05-OP-Operations/.keep", "");
    write(root, "src/crm_cm/service.ts", "export const x = 1;\n");
    write(root, "tests/unit/crm.test.ts", "// FR-001\n");
    tmp
}

/// prdtrack rooted at `root`, isolated from the caller's environment
fn prdtrack(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("prdtrack").unwrap();
    cmd.arg("--root")
        .arg(root)
        .arg("--no-color")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPOSITORY")
        .env_remove("PRDTRACK_CONFIG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", root.join(".config"))
        .env("HOME", root);
    cmd
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Scan / Code / Consistency
// =============================================================================

#[test]
fn test_scan_writes_status_and_ids() {
    let tmp = project();
    prdtrack(tmp.path())
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("documents:   2"));

    let status = read_json(&tmp.path().join("temp/prd_status.json"));
    assert_eq!(status["totals"]["total"], 2);
    assert_eq!(status["totals"]["completed"], 1);
    assert_eq!(status["totals"]["draft"], 1);
    assert_eq!(status["modules"].as_array().unwrap().len(), 2);

    let ids = read_json(&tmp.path().join("temp/fr_ids.json"));
    assert_eq!(ids["fr_ids"], serde_json::json!(["FR-001", "FR-002"]));
}

#[test]
fn test_scan_honours_output_and_dir() {
    let tmp = project();
    prdtrack(tmp.path())
        .args(["scan", "--dir", "PRD/02-CRM-Customer", "--output", "out"])
        .assert()
        .success();
    assert!(tmp.path().join("out/prd_status.json").is_file());
}

#[test]
fn test_scan_empty_tree() {
    let tmp = TempDir::new().unwrap();
    prdtrack(tmp.path()).arg("scan").assert().success();
    let status = read_json(&tmp.path().join("temp/prd_status.json"));
    assert_eq!(status["totals"]["total"], 0);
    assert_eq!(status["overall_progress"], 0.0);
}

#[test]
fn test_code_status() {
    let tmp = project();
    prdtrack(tmp.path()).arg("code").assert().success();
    let report = read_json(&tmp.path().join("temp/code_status.json"));
    assert_eq!(report["total_modules"], 2);
    let first = &report["modules"][0]["submodules"][0];
    assert_eq!(first["fr_id"], "FR-001");
    assert_eq!(first["has_code"], true);
}

#[test]
fn test_consistency_lists_untested() {
    let tmp = project();
    prdtrack(tmp.path())
        .arg("consistency")
        .assert()
        .success()
        .stdout(predicate::str::contains("FR-002"));

    let report = read_json(&tmp.path().join("temp/validation_report.json"));
    assert_eq!(report["total_fr_ids"], 2);
    assert_eq!(report["tested_fr_ids"], 1);
    assert_eq!(report["coverage_percentage"], 50.0);
    assert!(tmp.path().join("temp/validation_report.md").is_file());
}

// =============================================================================
// External sources fall back to mock data
// =============================================================================

#[test]
fn test_issues_without_token_are_mock() {
    let tmp = project();
    prdtrack(tmp.path())
        .arg("issues")
        .assert()
        .success()
        .stdout(predicate::str::contains("mock"));

    let report = read_json(&tmp.path().join("temp/issue_status.json"));
    assert_eq!(report["source"], "mock");
    assert_eq!(report["total_issues"], 5);
    assert_eq!(report["open_issues"], 3);
    assert!(report["issues_by_fr"]["FR-001"].is_object());
}

#[test]
fn test_tests_without_manifest_are_mock() {
    let tmp = project();
    prdtrack(tmp.path()).arg("tests").assert().success();
    let report = read_json(&tmp.path().join("temp/test_coverage.json"));
    assert_eq!(report["unit_tests"]["source"], "mock");
    assert_eq!(report["fr_coverage"]["FR-001"]["status"], "covered");
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_fails_incomplete_document() {
    let tmp = project();
    prdtrack(tmp.path())
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("PRD品質驗證報告"));
}

#[test]
fn test_validate_json_single_file() {
    let tmp = project();
    let output = prdtrack(tmp.path())
        .args(["validate", "--file", "PRD/02-CRM-Customer/cm/prd.md", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["total_files"], 1);
    assert_eq!(report["summary"]["failed_files"], 1);
}

#[test]
fn test_validate_empty_dir_passes() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("PRD")).unwrap();
    prdtrack(tmp.path()).arg("validate").assert().success();
}

#[test]
fn test_validate_save_writes_report() {
    let tmp = project();
    prdtrack(tmp.path())
        .args(["validate", "--save", "prd_validation.md"])
        .assert()
        .code(1);
    let saved = fs::read_to_string(tmp.path().join("temp/prd_validation.md")).unwrap();
    assert!(saved.contains("PRD品質驗證報告"));
}

#[test]
fn test_validate_missing_file_errors() {
    let tmp = project();
    prdtrack(tmp.path())
        .args(["validate", "--file", "nope.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

// =============================================================================
// Tracking document
// =============================================================================

#[test]
fn test_matrix_patch_is_idempotent() {
    let tmp = project();
    write(tmp.path(), "docs/tracking.md", "# Tracking\n\nHand-written intro.\n");

    prdtrack(tmp.path())
        .args(["matrix", "--document", "docs/tracking.md"])
        .assert()
        .success();
    let first = fs::read_to_string(tmp.path().join("docs/tracking.md")).unwrap();
    assert!(first.starts_with("# Tracking\n\nHand-written intro.\n"));
    assert_eq!(first.matches(MATRIX_BEGIN).count(), 1);
    assert!(first.contains("FR-001"));

    prdtrack(tmp.path())
        .args(["matrix", "--document", "docs/tracking.md"])
        .assert()
        .success();
    let second = fs::read_to_string(tmp.path().join("docs/tracking.md")).unwrap();
    assert_eq!(first, second);

    let report = read_json(&tmp.path().join("temp/tracking_report.json"));
    assert_eq!(report["issue_source"], "mock");
    assert_eq!(report["matrix_digest"].as_str().unwrap().len(), 64);
}

#[test]
fn test_matrix_escapes_pipes_in_status() {
    let tmp = project();
    write(
        tmp.path(),
        "PRD/02-CRM-Customer/cm/prd.md",
        "# [CRM-CM] 客戶管理\n\n### FR-001 客戶資料\n**狀態**: ✅ 完成 | v2\n",
    );
    write(tmp.path(), "docs/tracking.md", "# Tracking\n");
    prdtrack(tmp.path())
        .args(["matrix", "--document", "docs/tracking.md"])
        .assert()
        .success();

    let doc = fs::read_to_string(tmp.path().join("docs/tracking.md")).unwrap();
    let row = doc.lines().find(|l| l.starts_with("| FR-001 |")).unwrap();
    assert!(row.contains("✅ 完成 \\| v2"));
    assert_eq!(row.matches(" | ").count(), 7);
}

#[test]
fn test_matrix_rejects_unbalanced_markers() {
    let tmp = project();
    write(tmp.path(), "docs/tracking.md", &format!("{MATRIX_BEGIN}\nno end\n"));
    prdtrack(tmp.path())
        .args(["matrix", "--document", "docs/tracking.md"])
        .assert()
        .failure();
}

#[test]
fn test_modules_status_and_section() {
    let tmp = project();
    prdtrack(tmp.path()).arg("modules").assert().success();

    let status = read_json(&tmp.path().join("temp/module_status.json"));
    assert_eq!(status["modules"].as_array().unwrap().len(), 14);
    assert_eq!(status["modules"][0]["code"], "DSH");
    assert!(tmp.path().join("temp/module_status_report.md").is_file());

    let doc = fs::read_to_string(tmp.path().join("docs/TOC_Module_Progress_Matrix.md")).unwrap();
    assert!(doc.contains(MODULES_BEGIN));
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_daily_then_weekly_report() {
    let tmp = project();
    prdtrack(tmp.path()).arg("report").assert().success();

    let latest = fs::read_to_string(tmp.path().join("temp/latest_report.md")).unwrap();
    assert!(latest.contains("PRD品質日報"));
    let dailies: Vec<_> = fs::read_dir(tmp.path().join("temp"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("daily_report_"))
        .collect();
    assert_eq!(dailies.len(), 1);

    prdtrack(tmp.path()).args(["report", "--weekly"]).assert().success();
    let weekly = fs::read_dir(tmp.path().join("temp"))
        .unwrap()
        .filter_map(Result::ok)
        .find(|e| e.file_name().to_string_lossy().starts_with("weekly_report_week"))
        .unwrap();
    let text = fs::read_to_string(weekly.path()).unwrap();
    assert!(text.contains("daily_report_"));
}

#[test]
fn test_dashboard() {
    let tmp = project();
    prdtrack(tmp.path()).arg("dashboard").assert().success();
    let stats = read_json(&tmp.path().join("temp/statistics.json"));
    assert_eq!(stats["total_units"], 2);
    assert_eq!(stats["total_modules"], 2);
    let summary = fs::read_to_string(tmp.path().join("temp/dashboard_summary.md")).unwrap();
    assert!(summary.contains("模擬數據"));
}

// =============================================================================
// Misc
// =============================================================================

#[test]
fn test_config_shows_toml() {
    let tmp = TempDir::new().unwrap();
    prdtrack(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("prd_dir = \"PRD\""));
}

#[test]
fn test_project_config_overrides_defaults() {
    let tmp = project();
    write(tmp.path(), "prdtrack.toml", "output_dir = \"reports\"\n");
    prdtrack(tmp.path()).arg("scan").assert().success();
    assert!(tmp.path().join("reports/prd_status.json").is_file());
}

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();
    prdtrack(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prdtrack"));
}

#[test]
fn test_bad_flag_exits_two() {
    let tmp = TempDir::new().unwrap();
    prdtrack(tmp.path()).args(["scan", "--bogus"]).assert().code(2);
}
