// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest priority first: built-in defaults, the per-user config
//! file, `prdtrack.toml` in the project root, an explicit `--config` file,
//! then `PRDTRACK__*` environment variables. `GITHUB_TOKEN` and
//! `GITHUB_REPOSITORY` fill the issue tracker settings when unset.

use crate::scoring::WeightTable;
use crate::types::ModuleEntry;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the project root
pub const PROJECT_CONFIG_FILE: &str = "prdtrack.toml";

/// Issue tracker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API base URL
    pub api_url: String,
    /// `owner/name`
    pub repository: String,
    /// Bearer token; without one the mock dataset is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            repository: "Tsaitung/PRD-and-Development-Roadmap".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Scoring tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// Per-requirement table
    pub unit: WeightTable,
    /// Per-module go-live table
    pub module: WeightTable,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Project root every relative path is resolved against
    pub root: PathBuf,
    /// PRD documents
    pub prd_dir: PathBuf,
    /// Implementation sources
    pub src_dir: PathBuf,
    /// Test sources (`unit/` and `integration/` below it)
    pub tests_dir: PathBuf,
    /// Where JSON and Markdown artifacts are written
    pub output_dir: PathBuf,
    /// Living tracking document patched in place
    pub tracking_document: PathBuf,
    /// Extensions counted as implementation code
    pub code_extensions: Vec<String>,
    /// Module codes that still have a legacy system running
    pub legacy_modules: Vec<String>,
    /// Module registry
    pub modules: Vec<ModuleEntry>,
    /// Issue tracker
    pub github: GithubConfig,
    /// Scoring tables
    pub weights: WeightsConfig,
}

impl Config {
    /// Built-in defaults
    pub fn defaults() -> Result<Self> {
        Ok(Self {
            root: PathBuf::from("."),
            prd_dir: PathBuf::from("PRD"),
            src_dir: PathBuf::from("src"),
            tests_dir: PathBuf::from("tests"),
            output_dir: PathBuf::from("temp"),
            tracking_document: PathBuf::from("docs/TOC_Module_Progress_Matrix.md"),
            code_extensions: ["js", "ts", "jsx", "tsx", "py", "java", "cs", "php", "rb", "go", "rs"]
                .into_iter()
                .map(String::from)
                .collect(),
            legacy_modules: ["CRM", "IM", "OM", "MES", "WMS", "PM", "LM", "FA", "SA", "UP"]
                .into_iter()
                .map(String::from)
                .collect(),
            modules: ModuleEntry::defaults(),
            github: GithubConfig::default(),
            weights: WeightsConfig {
                unit: WeightTable::unit_default().context("Built-in unit weight table is invalid")?,
                module: WeightTable::module_default()
                    .context("Built-in module weight table is invalid")?,
            },
        })
    }

    /// Defaults rooted at `root`
    pub fn for_root(root: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self::defaults()?;
        config.root = root.into();
        Ok(config)
    }

    /// Resolve a configured path against the project root
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Absolute PRD directory
    #[must_use]
    pub fn prd_path(&self) -> PathBuf {
        self.resolve(&self.prd_dir)
    }

    /// Absolute source directory
    #[must_use]
    pub fn src_path(&self) -> PathBuf {
        self.resolve(&self.src_dir)
    }

    /// Absolute tests directory
    #[must_use]
    pub fn tests_path(&self) -> PathBuf {
        self.resolve(&self.tests_dir)
    }

    /// Absolute output directory
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    /// Absolute tracking document path
    #[must_use]
    pub fn tracking_document_path(&self) -> PathBuf {
        self.resolve(&self.tracking_document)
    }

    /// Display name for a module code, if registered
    #[must_use]
    pub fn module_name(&self, code: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.name.as_str())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Per-user configuration file, if the platform has a config directory
#[must_use]
pub fn user_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "prd-tracker")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from all layers
pub fn load(explicit: Option<&Path>, root: Option<&Path>) -> Result<Config> {
    let mut defaults = Config::defaults()?;
    if let Some(root) = root {
        defaults.root = root.to_path_buf();
    }
    let project_file = defaults.root.join(PROJECT_CONFIG_FILE);

    let mut builder = config::Config::builder().add_source(
        config::Config::try_from(&defaults).context("Failed to seed configuration defaults")?,
    );

    if let Some(user) = user_config_file() {
        debug!("User config candidate: {}", user.display());
        builder = builder.add_source(config::File::from(user).required(false));
    }
    builder = builder.add_source(config::File::from(project_file).required(false));
    if let Some(path) = explicit {
        builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("PRDTRACK")
            .prefix_separator("__")
            .separator("__"),
    );

    let mut loaded: Config = builder
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    // An explicit --root always wins over file contents
    if let Some(root) = root {
        loaded.root = root.to_path_buf();
    }
    if loaded.github.token.is_none() {
        loaded.github.token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
    }
    if let Ok(repo) = std::env::var("GITHUB_REPOSITORY") {
        if repo.contains('/') {
            loaded.github.repository = repo;
        }
    }

    debug!("Configuration loaded for root {}", loaded.root.display());
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_resolve_against_root() {
        let config = Config::for_root("/work").unwrap();
        assert_eq!(config.prd_path(), PathBuf::from("/work/PRD"));
        assert_eq!(config.output_path(), PathBuf::from("/work/temp"));
        assert_eq!(config.module_name("WMS"), Some("Warehouse Management System"));
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "output_dir = \"reports\"\n[github]\nrepository = \"acme/erp\"\n",
        )
        .unwrap();

        let config = load(None, Some(dir.path())).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.root, dir.path());
        assert_eq!(config.prd_dir, PathBuf::from("PRD"));
    }

    #[test]
    fn invalid_weights_fail_to_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[weights.unit.prd]\ncompleted = 90\n").unwrap();

        assert!(load(Some(&path), Some(dir.path())).is_err());
    }

    #[test]
    fn toml_output_contains_weights() {
        let toml = Config::defaults().unwrap().to_toml().unwrap();
        assert!(toml.contains("[weights.unit.prd]"));
        assert!(toml.contains("completed = 40"));
    }
}
