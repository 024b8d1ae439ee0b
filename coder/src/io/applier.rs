//! Applies coded file actions to a repository checkout.
//!
//! The whole batch is checked for containment before the first write. After
//! that, actions run in list order and a failure stops the pass; earlier
//! actions stay applied.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::error::PipelineError;
use crate::core::path::is_within_root;
use crate::core::types::FileAction;

/// Counts of actions applied by [`apply_actions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ApplySummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Refuse roots that are relative or implausibly short.
pub fn check_repo_root(repo_root: &Path, min_root_len: usize) -> Result<()> {
    if !repo_root.is_absolute() {
        return Err(PipelineError::UnsafeRoot {
            root: repo_root.to_path_buf(),
            reason: "path is not absolute".to_string(),
        }
        .into());
    }
    let len = repo_root.as_os_str().len();
    if len < min_root_len {
        return Err(PipelineError::UnsafeRoot {
            root: repo_root.to_path_buf(),
            reason: format!("path is shorter than {min_root_len} characters"),
        }
        .into());
    }
    Ok(())
}

/// Check that every action targets a path strictly below `repo_root`.
pub fn check_containment(repo_root: &Path, actions: &[FileAction]) -> Result<()> {
    for action in actions {
        if !is_within_root(action.file_path(), repo_root) {
            return Err(PipelineError::OutsideRoot {
                path: action.file_path().to_path_buf(),
                root: repo_root.to_path_buf(),
            }
            .into());
        }
    }
    Ok(())
}

/// Apply `actions` under `repo_root`.
#[instrument(skip_all, fields(repo_root = %repo_root.display(), actions = actions.len()))]
pub fn apply_actions(
    repo_root: &Path,
    actions: &[FileAction],
    min_root_len: usize,
) -> Result<ApplySummary> {
    check_repo_root(repo_root, min_root_len)?;
    check_containment(repo_root, actions)?;

    let total = actions.len();
    let mut summary = ApplySummary::default();
    for (idx, action) in actions.iter().enumerate() {
        let index = idx + 1;
        match action {
            FileAction::Create { file_path, content } => {
                info!(index, total, path = %file_path.display(), "creating file");
                write_file(file_path, content)?;
                summary.created += 1;
            }
            FileAction::Update { file_path, content } => {
                info!(index, total, path = %file_path.display(), "updating file");
                write_file(file_path, content)?;
                summary.updated += 1;
            }
            FileAction::Delete { file_path } => {
                info!(index, total, path = %file_path.display(), "deleting file");
                delete_file(file_path)?;
                summary.deleted += 1;
            }
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        deleted = summary.deleted,
        "all file actions applied"
    );
    Ok(summary)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(())
}

fn delete_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(PipelineError::MissingDeleteTarget {
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::remove_file(path).with_context(|| format!("delete {}", path.display()))?;
    debug!(path = %path.display(), "file deleted");
    Ok(())
}
