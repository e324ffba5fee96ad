use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collector::ExtractionPolicy;
use crate::sql_engine::parser::DEFAULT_RECURSION_LIMIT;

/// Name of the project configuration file looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "lineage_project.yaml";

/// Project configuration read from lineage_project.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Name of the project
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory holding the job documents
    #[serde(default = "default_jobs_path")]
    pub jobs_path: PathBuf,

    /// Regex a job name has to match
    #[serde(default = "default_job_name_pattern")]
    pub job_name_pattern: String,

    /// Only search the highest version of each job
    #[serde(default = "default_true")]
    pub only_latest_version: bool,

    /// SQL dialect of the grammar parser
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Try the grammar parser first
    #[serde(default = "default_true")]
    pub prefer_grammar_parser: bool,

    /// Fall back to pattern matching when the grammar parser fails
    #[serde(default = "default_true")]
    pub prefer_pattern_parser: bool,

    /// Nesting depth the grammar parser accepts per statement
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
}

fn default_name() -> String {
    "lineage_project".to_string()
}

fn default_jobs_path() -> PathBuf {
    PathBuf::from("jobs")
}

fn default_job_name_pattern() -> String {
    ".*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dialect() -> String {
    "generic".to_string()
}

fn default_recursion_limit() -> usize {
    DEFAULT_RECURSION_LIMIT
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            jobs_path: default_jobs_path(),
            job_name_pattern: default_job_name_pattern(),
            only_latest_version: true,
            dialect: default_dialect(),
            prefer_grammar_parser: true,
            prefer_pattern_parser: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl LineageConfig {
    pub fn policy(&self) -> ExtractionPolicy {
        ExtractionPolicy::from_flags(self.prefer_grammar_parser, self.prefer_pattern_parser)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Invalid project configuration")
    }
}

/// Reads the configuration file from the specified path or looks for
/// lineage_project.yaml in the current directory.
///
/// An explicit path must exist; without one, a missing file yields defaults.
pub fn read_config(config_path: Option<&Path>) -> Result<LineageConfig> {
    let (config_path, explicit) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (std::env::current_dir()?.join(CONFIG_FILE_NAME), false),
    };

    if !config_path.exists() {
        if explicit {
            bail!("Configuration file not found at: {}", config_path.display());
        }
        tracing::debug!(path = %config_path.display(), "No configuration file, using defaults");
        return Ok(LineageConfig::default());
    }

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config = LineageConfig::from_yaml(&config_str)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    tracing::info!(path = %config_path.display(), "Loaded configuration");

    Ok(config)
}
