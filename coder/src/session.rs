//! End-to-end sessions: feature coding, code review and dependency discovery.
//!
//! Each session is strictly sequential. Review runs fresh conversations
//! per file so findings for one file never see another file's context.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::agents::coder::CodingAgent;
use crate::agents::conversation::Conversation;
use crate::agents::dependencies::DependencyAgent;
use crate::agents::reviewer::ReviewAgent;
use crate::core::path::{is_within_root, normalize_lexically};
use crate::core::types::{FileAction, ReviewFinding, Snapshot};
use crate::io::applier::{ApplySummary, apply_actions};
use crate::io::backend::ChatBackend;
use crate::io::config::CoderConfig;
use crate::io::reviews::write_review;
use crate::io::snapshot::{SnapshotOptions, read_snapshot};

/// Inputs for [`run_feature_session`].
#[derive(Debug, Clone)]
pub struct FeatureRequest {
    pub repo_root: PathBuf,
    pub task: String,
    /// Base names to restrict the snapshot to.
    pub include: Option<Vec<String>>,
    /// Stop after the model answers; do not touch the filesystem.
    pub dry_run: bool,
}

/// Result of a feature session.
#[derive(Debug, Clone)]
pub struct FeatureOutcome {
    pub files_taught: usize,
    pub actions: Vec<FileAction>,
    /// `None` for dry runs.
    pub applied: Option<ApplySummary>,
}

/// Inputs for [`run_review_session`].
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub repo_root: PathBuf,
    pub include: Option<Vec<String>>,
}

/// Review result for one file.
#[derive(Debug, Clone)]
pub struct FileReview {
    pub file_path: PathBuf,
    pub dependencies: Vec<String>,
    pub findings: Vec<ReviewFinding>,
    /// Where findings were written; `None` when there were none.
    pub report_path: Option<PathBuf>,
}

fn resolve_root(repo_root: &Path) -> Result<PathBuf> {
    std::path::absolute(repo_root)
        .with_context(|| format!("resolve repository root {}", repo_root.display()))
}

fn snapshot_options(cfg: &CoderConfig, include: Option<Vec<String>>) -> SnapshotOptions {
    SnapshotOptions::new(cfg.snapshot.excluded_dirs.clone()).with_include(include)
}

/// Snapshot the repository, teach it, ask for the feature and apply the result.
#[instrument(skip_all, fields(repo_root = %request.repo_root.display(), dry_run = request.dry_run))]
pub fn run_feature_session<B: ChatBackend>(
    backend: &B,
    cfg: &CoderConfig,
    request: &FeatureRequest,
) -> Result<FeatureOutcome> {
    let repo_root = resolve_root(&request.repo_root)?;
    let snapshot = read_snapshot(&repo_root, &snapshot_options(cfg, request.include.clone()))?;

    let agent = CodingAgent::new(cfg.max_attempts)?;
    let mut conversation = Conversation::new(backend);
    agent.teach(&mut conversation, &snapshot)?;
    let actions = agent.code_feature(&mut conversation, &request.task, &repo_root)?;

    let applied = if request.dry_run {
        info!(actions = actions.len(), "dry run, leaving files untouched");
        None
    } else {
        Some(apply_actions(&repo_root, &actions, cfg.min_repo_root_len)?)
    };

    Ok(FeatureOutcome {
        files_taught: snapshot.len(),
        actions,
        applied,
    })
}

/// Review every snapshot file in isolation and write findings per file.
#[instrument(skip_all, fields(repo_root = %request.repo_root.display()))]
pub fn run_review_session<B: ChatBackend>(
    backend: &B,
    cfg: &CoderConfig,
    request: &ReviewRequest,
) -> Result<Vec<FileReview>> {
    let repo_root = resolve_root(&request.repo_root)?;
    let snapshot = read_snapshot(&repo_root, &snapshot_options(cfg, request.include.clone()))?;
    // Dependencies may live outside the allow-list but never outside the
    // snapshot rules.
    let eligible = match request.include {
        Some(_) => read_snapshot(&repo_root, &snapshot_options(cfg, None))?,
        None => snapshot.clone(),
    };
    let output_dir = cfg.review_output_dir(&repo_root);
    let coder = CodingAgent::new(cfg.max_attempts)?;
    let dependency_agent = DependencyAgent::new(cfg.max_attempts)?;
    let reviewer = ReviewAgent::new(cfg.max_attempts)?;

    let total = snapshot.len();
    let mut reviews = Vec::with_capacity(total);
    for (idx, (file_path, content)) in snapshot.iter().enumerate() {
        info!(index = idx + 1, total, file = %file_path.display(), "reviewing file");
        let mut dependency_conversation = Conversation::new(backend);
        let dependencies = dependency_agent.find_dependencies(
            &mut dependency_conversation,
            file_path,
            content,
            &repo_root,
        )?;

        let context = review_context(&eligible, file_path, content, &dependencies);
        let mut conversation = Conversation::new(backend);
        coder.teach(&mut conversation, &context)?;
        let findings = reviewer.review(&mut conversation)?;

        let report_path = if findings.is_empty() {
            info!(file = %file_path.display(), "no issues found");
            None
        } else {
            Some(write_review(&output_dir, &repo_root, file_path, &findings)?)
        };
        reviews.push(FileReview {
            file_path: file_path.to_path_buf(),
            dependencies,
            findings,
            report_path,
        });
    }
    Ok(reviews)
}

/// The reviewed file plus every dependency the snapshot rules allow.
///
/// Dependencies are looked up in `eligible` only, so paths outside the root
/// or excluded from snapshots (hidden, gitignored, denylisted) never reach
/// the model.
fn review_context(
    eligible: &Snapshot,
    file_path: &Path,
    content: &str,
    dependencies: &[String],
) -> Snapshot {
    let repo_root = eligible.root.as_path();
    let total = dependencies.len();
    let mut context = Snapshot::new(repo_root);
    for (idx, dependency) in dependencies.iter().enumerate() {
        let path = normalize_lexically(&repo_root.join(dependency.trim()));
        if path == file_path {
            continue;
        }
        if !is_within_root(&path, repo_root) {
            warn!(dependency = %path.display(), "dependency is outside the repository, skipping");
            continue;
        }
        let Some(dependency_content) = eligible.get(&path) else {
            warn!(dependency = %path.display(), "dependency is not a snapshot file, skipping");
            continue;
        };
        info!(index = idx + 1, total, dependency = %path.display(), "adding dependency");
        context.insert(path, dependency_content.to_string());
    }
    context.insert(file_path.to_path_buf(), content.to_string());
    context
}

/// Ask for the dependencies of a single file in a fresh conversation.
#[instrument(skip_all, fields(file = %file_path.display()))]
pub fn discover_dependencies<B: ChatBackend>(
    backend: &B,
    cfg: &CoderConfig,
    repo_root: &Path,
    file_path: &Path,
) -> Result<Vec<String>> {
    let repo_root = resolve_root(repo_root)?;
    let file_path = if file_path.is_absolute() {
        file_path.to_path_buf()
    } else {
        repo_root.join(file_path)
    };
    let code = fs::read_to_string(&file_path)
        .with_context(|| format!("read {}", file_path.display()))?;
    let agent = DependencyAgent::new(cfg.max_attempts)?;
    let mut conversation = Conversation::new(backend);
    agent.find_dependencies(&mut conversation, &file_path, &code, &repo_root)
}
