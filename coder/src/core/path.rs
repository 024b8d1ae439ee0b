//! Lexical path helpers for rooting model-supplied paths under a repository.
//!
//! Nothing here touches the filesystem; targets of CREATE actions usually do
//! not exist yet, so containment is decided on normalized components.

use std::path::{Component, Path, PathBuf};

/// Rewrite a model-supplied path so it is absolute and rooted at `repo_root`.
///
/// Leading repetitions of the root (with or without its leading separator) are
/// stripped, any remaining root/prefix component is dropped, and the rest is
/// joined under `repo_root`. Already-rooted and root-relative spellings of the
/// same file resolve to the same path.
pub fn rebase_under_root(repo_root: &Path, raw: &str) -> PathBuf {
    let relative_root = strip_leading_root(repo_root);
    let mut rest = Path::new(raw.trim());
    loop {
        if let Ok(stripped) = rest.strip_prefix(repo_root)
            && stripped != rest
        {
            rest = stripped;
            continue;
        }
        if !relative_root.as_os_str().is_empty()
            && let Ok(stripped) = rest.strip_prefix(&relative_root)
        {
            rest = stripped;
            continue;
        }
        break;
    }
    repo_root.join(strip_leading_root(rest))
}

fn strip_leading_root(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::RootDir | Component::Prefix(_)))
        .collect()
}

/// Resolve `.` and `..` components without consulting the filesystem.
///
/// `..` at the root is dropped, matching how the OS resolves `/..`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = normalized
                    .components()
                    .next_back()
                    .is_none_or(|last| matches!(last, Component::RootDir | Component::Prefix(_)));
                if at_root {
                    if normalized.as_os_str().is_empty() {
                        normalized.push(component);
                    }
                } else if normalized
                    .components()
                    .next_back()
                    .is_some_and(|last| last == Component::ParentDir)
                {
                    normalized.push(component);
                } else {
                    normalized.pop();
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// True when `path` names something strictly below `root`.
pub fn is_within_root(path: &Path, root: &Path) -> bool {
    let path = normalize_lexically(path);
    let root = normalize_lexically(root);
    path != root && path.starts_with(&root)
}
