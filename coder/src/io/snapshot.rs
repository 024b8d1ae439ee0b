//! Repository snapshot reader: walks a tree and returns path → content.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::types::Snapshot;

/// Filters applied while reading a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    /// When set, only files whose base name is listed are read.
    pub include: Option<Vec<String>>,
    /// Directory names pruned from the walk wherever they appear.
    pub excluded_dirs: Vec<String>,
}

impl SnapshotOptions {
    pub fn new(excluded_dirs: Vec<String>) -> Self {
        Self {
            include: None,
            excluded_dirs,
        }
    }

    pub fn with_include(mut self, include: Option<Vec<String>>) -> Self {
        self.include = include.filter(|names| !names.is_empty());
        self
    }

    fn allow_listed(&self, name: &str) -> Option<bool> {
        self.include
            .as_ref()
            .map(|names| names.iter().any(|allowed| allowed == name))
    }
}

/// Read every eligible text file under `root`.
///
/// Files that cannot be read as UTF-8 are skipped with a warning.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn read_snapshot(root: &Path, options: &SnapshotOptions) -> Result<Snapshot> {
    let root = std::path::absolute(root)
        .with_context(|| format!("resolve repository root {}", root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("repository root {} is not a directory", root.display());
    }
    let gitignore = load_gitignore(&root)?;

    let mut snapshot = Snapshot::new(&root);
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, &options.excluded_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(err = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let allow_listed = options.allow_listed(&name);
        if allow_listed == Some(false) {
            continue;
        }
        if name.starts_with('.') && allow_listed != Some(true) {
            continue;
        }
        if gitignore
            .matched_path_or_any_parents(entry.path(), false)
            .is_ignore()
        {
            debug!(path = %entry.path().display(), "ignored by .gitignore");
            continue;
        }
        if let Some(content) = read_text(entry.path()) {
            snapshot.insert(entry.path().to_path_buf(), content);
        }
    }

    info!(files = snapshot.len(), "read repository snapshot");
    Ok(snapshot)
}

/// Expand `pattern` (relative to `root`, `**` allowed) into the base names of
/// the files it matches, for use as an allow-list.
pub fn include_names_from_glob(root: &Path, pattern: &str) -> Result<Vec<String>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern.trim().trim_start_matches('/')
    );
    let mut names = BTreeSet::new();
    for entry in glob::glob(&full).with_context(|| format!("invalid include glob {pattern:?}"))? {
        let path = entry.context("read include glob match")?;
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            names.insert(name.to_string_lossy().into_owned());
        }
    }
    if names.is_empty() {
        anyhow::bail!("include glob {pattern:?} matched no files under {}", root.display());
    }
    info!(pattern, names = names.len(), "expanded include glob");
    Ok(names.into_iter().collect())
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => Some(content),
            Err(_) => {
                warn!(path = %path.display(), "file is not valid UTF-8, skipping");
                None
            }
        },
        Err(err) => {
            warn!(path = %path.display(), err = %err, "failed to read file, skipping");
            None
        }
    }
}

fn is_excluded_dir(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && excluded
            .iter()
            .any(|name| entry.file_name().to_string_lossy() == name.as_str())
}

fn load_gitignore(root: &Path) -> Result<Gitignore> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        return Ok(Gitignore::empty());
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(&path) {
        warn!(path = %path.display(), err = %err, "some .gitignore lines were not understood");
    }
    builder
        .build()
        .with_context(|| format!("compile {}", path.display()))
}
