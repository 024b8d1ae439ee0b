//! Coder configuration stored under `.coder/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Directory (relative to the repository root) holding coder-owned state.
pub const STATE_DIR: &str = ".coder";

/// Coder configuration (TOML).
///
/// Missing fields fall back to defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoderConfig {
    /// Retries granted to a structured request after its first attempt.
    pub max_attempts: u32,

    /// Repository roots shorter than this are refused by the applier.
    pub min_repo_root_len: usize,

    pub model: ModelConfig,
    pub snapshot: SnapshotConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Chat-completion API base, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Transport timeout for one model call.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory names pruned from every snapshot walk.
    pub excluded_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewConfig {
    /// Where `*.issues.json` files go; relative paths resolve against the repo root.
    pub output_dir: PathBuf,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            min_repo_root_len: 4,
            model: ModelConfig::default(),
            snapshot: SnapshotConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 10 * 60,
            temperature: None,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: [
                ".git",
                ".idea",
                ".vscode",
                "venv",
                ".venv",
                "__pycache__",
                "node_modules",
                STATE_DIR,
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            output_dir: Path::new(STATE_DIR).join("reviews"),
        }
    }
}

impl CoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_repo_root_len == 0 {
            return Err(anyhow!("min_repo_root_len must be > 0"));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(anyhow!("model.base_url must be non-empty"));
        }
        if self.model.model.trim().is_empty() {
            return Err(anyhow!("model.model must be non-empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must be non-empty"));
        }
        if self.model.timeout_secs == 0 {
            return Err(anyhow!("model.timeout_secs must be > 0"));
        }
        if self.review.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("review.output_dir must be non-empty"));
        }
        Ok(())
    }

    /// Resolve the review output directory against `repo_root`.
    pub fn review_output_dir(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.review.output_dir)
    }
}

/// Default config location for a repository.
pub fn default_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(STATE_DIR).join("config.toml")
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `CoderConfig::default()`.
pub fn load_config(path: &Path) -> Result<CoderConfig> {
    if !path.exists() {
        let cfg = CoderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: CoderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &CoderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
