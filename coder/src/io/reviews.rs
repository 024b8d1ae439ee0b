//! Writes review findings where an operator can read them.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::core::types::ReviewFinding;

/// Write `findings` for `file_path` as pretty JSON under `output_dir`.
///
/// The file name is the path relative to `repo_root` with separators replaced
/// by `__`, so same-named files in different directories do not collide.
pub fn write_review(
    output_dir: &Path,
    repo_root: &Path,
    file_path: &Path,
    findings: &[ReviewFinding],
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create review dir {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}.issues.json", flat_name(repo_root, file_path)));
    let mut payload = serde_json::to_string_pretty(findings).context("serialize findings")?;
    payload.push('\n');
    fs::write(&path, payload).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), findings = findings.len(), "wrote review findings");
    Ok(path)
}

fn flat_name(repo_root: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(repo_root).unwrap_or(file_path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("__")
}
