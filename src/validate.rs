// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! PRD quality validation
//!
//! Eight structural checks per document. A document passes only when every
//! check passes; its score is the share of passed checks.

use crate::schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Module information fields every PRD must carry
pub const MODULE_INFO_FIELDS: [&str; 5] = ["模組代碼", "模組名稱", "負責人", "最後更新", "版本"];

/// Fields every requirement block must carry
pub const FR_FIELDS: [&str; 7] = [
    "條件/觸發",
    "行為",
    "資料輸入",
    "資料輸出",
    "UI反應",
    "例外處理",
    "優先級",
];

/// Terms the API section must mention
pub const API_FIELDS: [&str; 5] = ["API 端點", "請求/回應", "數據模型", "權限要求", "認證方式"];

/// Minimum acceptance criteria per requirement
pub const MIN_ACCEPTANCE_CRITERIA: usize = 3;

/// File names validated when scanning a directory
pub const VALIDATED_FILE_NAMES: [&str; 2] = ["prd.md", "README.md"];

/// The eight checks, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Module info block
    ModuleInfo,
    /// Heading identifiers are namespaced and unique
    FrIds,
    /// Every requirement has the seven fields
    FrCompleteness,
    /// YAML acceptance criteria per requirement
    AcceptanceCriteria,
    /// API section
    ApiSpec,
    /// TypeScript interface and SQL table
    DataModel,
    /// Test directories next to the document
    TestMapping,
    /// Status fields use known labels
    StatusConsistency,
}

impl Check {
    /// Every check
    pub const ALL: [Self; 8] = [
        Self::ModuleInfo,
        Self::FrIds,
        Self::FrCompleteness,
        Self::AcceptanceCriteria,
        Self::ApiSpec,
        Self::DataModel,
        Self::TestMapping,
        Self::StatusConsistency,
    ];

    /// Key used in reports
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ModuleInfo => "module_info",
            Self::FrIds => "fr_ids",
            Self::FrCompleteness => "fr_completeness",
            Self::AcceptanceCriteria => "acceptance_criteria",
            Self::ApiSpec => "api_spec",
            Self::DataModel => "data_model",
            Self::TestMapping => "test_mapping",
            Self::StatusConsistency => "status_consistency",
        }
    }

    /// Advice shown when the check fails somewhere
    #[must_use]
    pub fn recommendation(self) -> Option<&'static str> {
        match self {
            Self::ModuleInfo => Some("優先完善模組資訊欄位，確保版本號格式正確(vX.X.X)"),
            Self::FrIds => Some("檢查並修正FR-ID格式，確保符合FR-[模組]-[子模組]-[序號]格式"),
            Self::FrCompleteness => Some("補充功能需求的七大必填欄位，特別注意條件/觸發和例外處理"),
            Self::AcceptanceCriteria => Some("使用YAML格式撰寫驗收標準，每個FR至少包含3個驗收條件"),
            Self::ApiSpec => Some("完善API規格定義，包含端點、請求/回應格式和認證方式"),
            Self::DataModel => Some("添加TypeScript介面定義和SQL建表語句"),
            Self::TestMapping => Some("創建對應的測試目錄結構(unit/integration/e2e)"),
            Self::StatusConsistency => None,
        }
    }

    fn run(self, path: &Path, content: &str) -> CheckOutcome {
        match self {
            Self::ModuleInfo => check_module_info(content),
            Self::FrIds => check_fr_ids(content),
            Self::FrCompleteness => check_fr_completeness(content),
            Self::AcceptanceCriteria => check_acceptance_criteria(content),
            Self::ApiSpec => check_api_spec(content),
            Self::DataModel => check_data_model(content),
            Self::TestMapping => check_test_mapping(path),
            Self::StatusConsistency => check_status_consistency(content),
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Whether the check passed
    pub passed: bool,
    /// What is missing or wrong
    pub problems: Vec<String>,
}

impl CheckOutcome {
    fn from_problems(problems: Vec<String>) -> Self {
        Self { passed: problems.is_empty(), problems }
    }
}

/// Validation of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileValidation {
    /// Document path
    pub file: PathBuf,
    /// Parent directory name
    pub module: String,
    /// Outcome per check
    pub checks: BTreeMap<Check, CheckOutcome>,
    /// Read errors
    pub errors: Vec<String>,
    /// Passed checks as a percentage
    pub score: f64,
}

impl FileValidation {
    /// Whether every check passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.checks.len() == Check::ALL.len() && self.checks.values().all(|c| c.passed)
    }

    /// Checks that failed
    pub fn failed_checks(&self) -> impl Iterator<Item = (Check, &CheckOutcome)> {
        self.checks.iter().filter(|(_, c)| !c.passed).map(|(k, c)| (*k, c))
    }
}

/// Totals over all validated documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Documents validated
    pub total_files: usize,
    /// Documents with a perfect score
    pub passed_files: usize,
    /// Everything else
    pub failed_files: usize,
    /// Mean score
    pub average_score: f64,
}

/// Validation report, written as JSON or Markdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Run timestamp
    pub timestamp: DateTime<Utc>,
    /// Totals
    pub summary: ValidationSummary,
    /// Per document
    pub files: Vec<FileValidation>,
    /// Failing documents per check
    pub errors_by_type: BTreeMap<Check, Vec<PathBuf>>,
    /// Advice derived from `errors_by_type`
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    /// Build from per-file results
    #[must_use]
    pub fn from_files(files: Vec<FileValidation>) -> Self {
        let mut summary = ValidationSummary { total_files: files.len(), ..Default::default() };
        let mut errors_by_type: BTreeMap<Check, Vec<PathBuf>> = BTreeMap::new();
        let mut score_sum = 0.0;

        for file in &files {
            score_sum += file.score;
            if file.passed() {
                summary.passed_files += 1;
            } else {
                summary.failed_files += 1;
            }
            for (check, _) in file.failed_checks() {
                errors_by_type.entry(check).or_default().push(file.file.clone());
            }
        }
        if !files.is_empty() {
            summary.average_score = score_sum / files.len() as f64;
        }

        let recommendations = errors_by_type
            .keys()
            .filter_map(|c| c.recommendation())
            .map(String::from)
            .collect();

        Self {
            timestamp: Utc::now(),
            summary,
            files,
            errors_by_type,
            recommendations,
        }
    }

    /// Whether any document failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.summary.failed_files > 0
    }
}

/// Documents to validate below `dir`, sorted
#[must_use]
pub fn find_documents(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_type().is_file()
                && VALIDATED_FILE_NAMES
                    .iter()
                    .any(|n| e.file_name().to_string_lossy() == *n)
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Validate every document below `dir`
#[must_use]
pub fn validate_dir(dir: &Path) -> ValidationReport {
    let files = find_documents(dir).iter().map(|p| validate_file(p)).collect();
    ValidationReport::from_files(files)
}

/// Validate one document; read failures score 0
#[must_use]
pub fn validate_file(path: &Path) -> FileValidation {
    let module = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return FileValidation {
                file: path.to_path_buf(),
                module,
                checks: BTreeMap::new(),
                errors: vec![format!("檔案讀取錯誤: {e}")],
                score: 0.0,
            };
        }
    };

    let result = validate_content(path, &content);
    debug!("{}: {:.1}", path.display(), result.score);
    FileValidation { module, ..result }
}

/// Run all checks on document text; `path` locates the sibling test tree
#[must_use]
pub fn validate_content(path: &Path, content: &str) -> FileValidation {
    let checks: BTreeMap<Check, CheckOutcome> =
        Check::ALL.into_iter().map(|c| (c, c.run(path, content))).collect();
    let passed = checks.values().filter(|c| c.passed).count();
    FileValidation {
        file: path.to_path_buf(),
        module: String::new(),
        score: passed as f64 / checks.len() as f64 * 100.0,
        checks,
        errors: Vec::new(),
    }
}

fn check_module_info(content: &str) -> CheckOutcome {
    let mut problems = Vec::new();
    for field in MODULE_INFO_FIELDS {
        match schema::labelled_field(field).captures(content) {
            Some(caps) => {
                if field == "版本" && !schema::VERSION.is_match(caps[1].trim()) {
                    problems.push("版本號格式錯誤(應為vX.X.X)".to_string());
                }
            }
            None => problems.push(field.to_string()),
        }
    }
    CheckOutcome::from_problems(problems)
}

fn heading_ids(content: &str) -> Vec<String> {
    schema::FR_HEADING
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

fn check_fr_ids(content: &str) -> CheckOutcome {
    let ids = heading_ids(content);
    let mut problems: Vec<String> = Vec::new();
    let mut report = |problem: String| {
        if !problems.contains(&problem) {
            problems.push(problem);
        }
    };
    let mut seen: Vec<&str> = Vec::new();
    for id in &ids {
        if !schema::FR_ID_NAMESPACED.is_match(id) {
            report(format!("無效: {id}"));
        }
        if seen.contains(&id.as_str()) {
            report(format!("重複: {id}"));
        } else {
            seen.push(id);
        }
    }
    CheckOutcome::from_problems(problems)
}

/// Requirement blocks: identifier and the text up to the next heading
fn fr_blocks(content: &str) -> Vec<(String, &str)> {
    let heads: Vec<_> = schema::FR_HEADING.captures_iter(content).collect();
    heads
        .iter()
        .enumerate()
        .map(|(i, caps)| {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let end = heads
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(content.len(), |m| m.start());
            (caps[1].to_string(), &content[whole.end..end])
        })
        .collect()
}

fn check_fr_completeness(content: &str) -> CheckOutcome {
    let mut problems = Vec::new();
    for (id, block) in fr_blocks(content) {
        let missing: Vec<&str> = FR_FIELDS
            .iter()
            .copied()
            .filter(|f| !schema::labelled_field_marker(f).is_match(block))
            .collect();
        if !missing.is_empty() {
            problems.push(format!("{id}: {}", missing.join(", ")));
        }
    }
    CheckOutcome::from_problems(problems)
}

/// Number of items in an acceptance-criteria YAML block.
///
/// A block that parses to anything other than a sequence counts as empty.
pub fn yaml_list_len(block: &str) -> Result<usize, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(block)?;
    Ok(value.as_sequence().map_or(0, Vec::len))
}

fn check_acceptance_criteria(content: &str) -> CheckOutcome {
    let blocks: Vec<&str> = schema::ACCEPTANCE_BLOCK
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let ids = heading_ids(content);

    let mut problems: Vec<String> = ids
        .iter()
        .skip(blocks.len())
        .map(|id| format!("缺少驗收標準: {id}"))
        .collect();

    for (i, block) in blocks.iter().enumerate() {
        match yaml_list_len(block) {
            Ok(n) if n >= MIN_ACCEPTANCE_CRITERIA => {}
            Ok(_) => problems.push(format!("FR {}: 需要至少3個驗收標準", i + 1)),
            Err(e) => {
                debug!("Acceptance criteria block {} is not valid YAML: {}", i + 1, e);
                problems.push(format!("FR {}: YAML格式錯誤", i + 1));
            }
        }
    }
    CheckOutcome::from_problems(problems)
}

fn check_api_spec(content: &str) -> CheckOutcome {
    if !content.contains("API 設計") && !content.contains("API設計") {
        return CheckOutcome::from_problems(vec!["缺少API設計章節".into()]);
    }
    let mut problems: Vec<String> = API_FIELDS
        .iter()
        .filter(|f| !content.contains(*f))
        .map(|f| (*f).to_string())
        .collect();
    if !schema::API_ENDPOINT.is_match(content) {
        problems.push("缺少API端點定義".into());
    }
    CheckOutcome::from_problems(problems)
}

fn check_data_model(content: &str) -> CheckOutcome {
    let mut problems = Vec::new();
    if !schema::TS_INTERFACE.is_match(content) {
        problems.push("缺少TypeScript介面定義".into());
    }
    if !schema::SQL_CREATE_TABLE.is_match(content) {
        problems.push("缺少SQL建表語句".into());
    }
    CheckOutcome::from_problems(problems)
}

fn has_test_file(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(Result::ok).any(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.contains(".test.") || name.contains(".spec.")
        })
    })
}

fn check_test_mapping(path: &Path) -> CheckOutcome {
    let tests = path.parent().unwrap_or(Path::new(".")).join("tests");
    if !tests.is_dir() {
        return CheckOutcome::from_problems(vec!["測試目錄不存在".into()]);
    }
    let mut problems = Vec::new();
    for kind in ["unit", "integration", "e2e"] {
        let dir = tests.join(kind);
        if !dir.is_dir() {
            problems.push(format!("{kind}測試目錄不存在"));
        } else if !has_test_file(&dir) {
            problems.push(format!("{kind}測試檔案不存在"));
        }
    }
    CheckOutcome::from_problems(problems)
}

fn check_status_consistency(content: &str) -> CheckOutcome {
    let problems = schema::STATUS_FIELD
        .captures_iter(content)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !schema::VALID_STATUS_FIELDS.iter().any(|v| s.contains(v)))
        .collect();
    CheckOutcome::from_problems(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = r#"# 客戶管理 [CRM-CM]

- **模組代碼**: CRM-CM
- **模組名稱**: 客戶管理
- **負責人**: team-crm
- **最後更新**: 2025-01-10
- **版本**: v1.0.0

### FR-CRM-CM-001 建立客戶
- **狀態**: 🟡 開發中
- **條件/觸發**: 使用者點擊新增
- **行為**: 建立客戶
- **資料輸入**: 名稱
- **資料輸出**: 客戶編號
- **UI反應**: 顯示成功訊息
- **例外處理**: 重複名稱
- **優先級**: P0

**驗收標準**:
```yaml
- 可建立客戶
- 名稱必填
- 重複時提示
```

## API 設計
API 端點 請求/回應 數據模型 權限要求 認證方式
POST /api/v1/customers

```typescript
interface Customer { id: string }
```

```sql
CREATE TABLE customers (id TEXT);
```
"#;

    fn write_tests_tree(module: &Path) {
        for kind in ["unit", "integration", "e2e"] {
            let dir = module.join("tests").join(kind);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("customer.test.ts"), "").unwrap();
        }
    }

    #[test]
    fn complete_document_passes_all_checks() {
        let tmp = TempDir::new().unwrap();
        let module = tmp.path().join("02-CRM");
        write_tests_tree(&module);
        let prd = module.join("prd.md");
        fs::write(&prd, GOOD).unwrap();

        let result = validate_file(&prd);
        let failed: Vec<_> = result.failed_checks().map(|(c, o)| (c, o.problems.clone())).collect();
        assert!(failed.is_empty(), "{failed:?}");
        assert_eq!(result.score, 100.0);
        assert_eq!(result.module, "02-CRM");
    }

    #[test]
    fn missing_test_tree_costs_one_check() {
        let result = validate_content(Path::new("/nowhere/prd.md"), GOOD);
        assert!(!result.checks[&Check::TestMapping].passed);
        assert_eq!(result.score, 7.0 / 8.0 * 100.0);
    }

    #[test]
    fn bad_version_and_simple_ids() {
        let text = "- **版本**: 1.0\n### FR-001\n### FR-001\n";
        let result = validate_content(Path::new("x/prd.md"), text);
        let info = &result.checks[&Check::ModuleInfo];
        assert!(info.problems.iter().any(|p| p.contains("版本號格式錯誤")));
        let ids = &result.checks[&Check::FrIds];
        assert_eq!(ids.problems, vec!["無效: FR-001", "重複: FR-001"]);
    }

    #[test]
    fn acceptance_yaml_structure() {
        assert_eq!(yaml_list_len("\n- a\n- b\n- c\n").unwrap(), 3);
        assert_eq!(yaml_list_len("- a\n- b:\n    nested: true\n- c\n").unwrap(), 3);
        assert_eq!(yaml_list_len("key: value\n").unwrap(), 0);
        assert_eq!(yaml_list_len("").unwrap(), 0);

        let short = "### FR-CRM-CM-001\n**驗收標準**:\n```yaml\n- one\n```\n### FR-CRM-CM-002\n";
        let outcome = check_acceptance_criteria(short);
        assert_eq!(outcome.problems.len(), 2);
    }

    #[test]
    fn flow_sequence_counts_as_list() {
        assert_eq!(yaml_list_len("[\"a\", \"b\", \"c\"]").unwrap(), 3);

        let doc = "### FR-CRM-CM-001\n**驗收標準**:\n```yaml\n[\"登入成功\", \"登入失敗\", \"帳號鎖定\"]\n```\n";
        assert!(check_acceptance_criteria(doc).passed);
    }

    #[test]
    fn unterminated_quote_is_a_format_error() {
        assert!(yaml_list_len("- \"unterminated\n- b\n- c").is_err());

        let doc = "### FR-CRM-CM-001\n**驗收標準**:\n```yaml\n- \"unterminated\n- b\n- c\n```\n";
        let outcome = check_acceptance_criteria(doc);
        assert!(!outcome.passed);
        assert_eq!(outcome.problems, vec!["FR 1: YAML格式錯誤"]);
    }

    #[test]
    fn unknown_status_label_fails() {
        let outcome = check_status_consistency("**狀態**: 🟢 上線\n**狀態**: ✅ 完成\n");
        assert_eq!(outcome.problems, vec!["🟢 上線"]);
    }

    #[test]
    fn report_collects_errors_and_recommendations() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("01-DSH");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("prd.md"), "# empty").unwrap();
        fs::write(dir.join("notes.md"), "ignored").unwrap();

        let report = validate_dir(tmp.path());
        assert_eq!(report.summary.total_files, 1);
        assert!(report.has_failures());
        assert!(report.errors_by_type.contains_key(&Check::ModuleInfo));
        assert!(!report.recommendations.is_empty());
    }
}
