//! Prompt rendering for every model-facing request.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::Snapshot;

const TEACH_TEMPLATE: &str = include_str!("prompts/teach.md");
const CODE_FEATURE_TEMPLATE: &str = include_str!("prompts/code_feature.md");
const DEPENDENCIES_TEMPLATE: &str = include_str!("prompts/dependencies.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");

#[derive(Debug, Serialize)]
struct SnapshotFile<'a> {
    path: String,
    content: &'a str,
}

/// Template engine wrapper around minijinja.
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("teach", TEACH_TEMPLATE)
            .context("load teach template")?;
        env.add_template("code_feature", CODE_FEATURE_TEMPLATE)
            .context("load code_feature template")?;
        env.add_template("dependencies", DEPENDENCIES_TEMPLATE)
            .context("load dependencies template")?;
        env.add_template("review", REVIEW_TEMPLATE)
            .context("load review template")?;
        Ok(Self { env })
    }

    /// One delimited payload holding every snapshot file.
    pub fn teach(&self, snapshot: &Snapshot) -> Result<String> {
        let files: Vec<SnapshotFile<'_>> = snapshot
            .iter()
            .map(|(path, content)| SnapshotFile {
                path: path.display().to_string(),
                content,
            })
            .collect();
        self.render(
            "teach",
            context! {
                root => snapshot.root.display().to_string(),
                files => files,
            },
        )
    }

    pub fn code_feature(&self, task: &str, repo_root: &Path) -> Result<String> {
        self.render(
            "code_feature",
            context! {
                task => task.trim(),
                repo_root => repo_root.display().to_string(),
            },
        )
    }

    pub fn dependencies(&self, file_path: &Path, code: &str, repo_root: &Path) -> Result<String> {
        self.render(
            "dependencies",
            context! {
                code => code,
                file_path => file_path.display().to_string(),
                repo_root => repo_root.display().to_string(),
            },
        )
    }

    pub fn review(&self) -> Result<String> {
        self.render("review", context! {})
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn teach_delimits_every_file() {
        let mut snapshot = Snapshot::new("/repo/x");
        snapshot.insert(PathBuf::from("/repo/x/a.py"), "print('{{ not a tag }}')".to_string());
        snapshot.insert(PathBuf::from("/repo/x/b.py"), "pass".to_string());

        let rendered = Prompts::new().expect("prompts").teach(&snapshot).expect("render");
        assert!(rendered.contains("# /repo/x/a.py\nprint('{{ not a tag }}')"));
        assert!(rendered.contains("# /repo/x/b.py\npass"));
        assert_eq!(rendered.matches("#########################").count(), 4);
    }

    #[test]
    fn code_feature_mentions_task_and_contract() {
        let rendered = Prompts::new()
            .expect("prompts")
            .code_feature("  add a remove_todo method ", Path::new("/repo/x"))
            .expect("render");
        assert!(rendered.contains("add a remove_todo method\n"));
        assert!(rendered.contains("EXPLANATION.md"));
        assert!(rendered.contains("\"action\": \"DELETE\""));
        assert!(rendered.contains("/repo/x"));
    }

    #[test]
    fn dependencies_embeds_code_and_paths() {
        let rendered = Prompts::new()
            .expect("prompts")
            .dependencies(Path::new("/repo/x/a.py"), "import b", Path::new("/repo/x"))
            .expect("render");
        assert!(rendered.contains("import b"));
        assert!(rendered.contains("/repo/x/a.py"));
    }

    #[test]
    fn review_asks_for_fix_suggestions() {
        let rendered = Prompts::new().expect("prompts").review().expect("render");
        assert!(rendered.contains("\"fix_suggestion\""));
    }
}
