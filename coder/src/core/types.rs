//! Shared types exchanged between the conversation, the orchestrators and the
//! file-system side of the pipeline.
//!
//! Wire shapes (what the model emits) are decoded into these types only after
//! the reply has passed schema validation in [`crate::core::schema`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One immutable conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Discriminant of a [`FileAction`], as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Create => "CREATE",
            ActionKind::Update => "UPDATE",
            ActionKind::Delete => "DELETE",
        }
    }
}

/// A single model-proposed change to one file.
///
/// `Delete` carries no content; any content the model sends along with a
/// delete is dropped during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileAction", into = "RawFileAction")]
pub enum FileAction {
    Create { file_path: PathBuf, content: String },
    Update { file_path: PathBuf, content: String },
    Delete { file_path: PathBuf },
}

impl FileAction {
    pub fn file_path(&self) -> &Path {
        match self {
            FileAction::Create { file_path, .. }
            | FileAction::Update { file_path, .. }
            | FileAction::Delete { file_path } => file_path,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            FileAction::Create { .. } => ActionKind::Create,
            FileAction::Update { .. } => ActionKind::Update,
            FileAction::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Return the same action retargeted at `file_path`.
    pub fn with_file_path(self, file_path: PathBuf) -> Self {
        match self {
            FileAction::Create { content, .. } => FileAction::Create { file_path, content },
            FileAction::Update { content, .. } => FileAction::Update { file_path, content },
            FileAction::Delete { .. } => FileAction::Delete { file_path },
        }
    }
}

/// Wire representation: `{ "file_path", "content"?, "action" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFileAction {
    file_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    action: ActionKind,
}

impl TryFrom<RawFileAction> for FileAction {
    type Error = String;

    fn try_from(raw: RawFileAction) -> Result<Self, Self::Error> {
        match (raw.action, raw.content) {
            (ActionKind::Create, Some(content)) => Ok(FileAction::Create {
                file_path: raw.file_path,
                content,
            }),
            (ActionKind::Update, Some(content)) => Ok(FileAction::Update {
                file_path: raw.file_path,
                content,
            }),
            (ActionKind::Delete, _) => Ok(FileAction::Delete {
                file_path: raw.file_path,
            }),
            (kind, None) => Err(format!(
                "{} action for {} is missing content",
                kind.as_str(),
                raw.file_path.display()
            )),
        }
    }
}

impl From<FileAction> for RawFileAction {
    fn from(action: FileAction) -> Self {
        match action {
            FileAction::Create { file_path, content } => RawFileAction {
                file_path,
                content: Some(content),
                action: ActionKind::Create,
            },
            FileAction::Update { file_path, content } => RawFileAction {
                file_path,
                content: Some(content),
                action: ActionKind::Update,
            },
            FileAction::Delete { file_path } => RawFileAction {
                file_path,
                content: None,
                action: ActionKind::Delete,
            },
        }
    }
}

/// One issue reported by the review pass.
///
/// Models sometimes spell the fix as `suggestion`; when both keys are present
/// `fix_suggestion` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReviewFinding")]
pub struct ReviewFinding {
    pub explanation: String,
    pub fix_suggestion: String,
}

#[derive(Deserialize)]
struct RawReviewFinding {
    explanation: String,
    fix_suggestion: Option<String>,
    suggestion: Option<String>,
}

impl TryFrom<RawReviewFinding> for ReviewFinding {
    type Error = String;

    fn try_from(raw: RawReviewFinding) -> Result<Self, Self::Error> {
        let fix_suggestion = raw
            .fix_suggestion
            .or(raw.suggestion)
            .ok_or_else(|| "review finding is missing fix_suggestion".to_string())?;
        Ok(ReviewFinding {
            explanation: raw.explanation,
            fix_suggestion,
        })
    }
}

/// Path → content view of a repository, keyed by absolute path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub root: PathBuf,
    pub files: BTreeMap<PathBuf, String>,
}

impl Snapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, path: PathBuf, content: String) {
        self.files.insert(path, content);
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_path(), content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_without_content_is_rejected() {
        let err = serde_json::from_str::<FileAction>(r#"{"file_path":"a.py","action":"CREATE"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("missing content"));
    }

    #[test]
    fn delete_drops_content() {
        let action: FileAction = serde_json::from_str(
            r#"{"file_path":"a.py","content":"stale","action":"DELETE"}"#,
        )
        .expect("decode");
        assert_eq!(
            action,
            FileAction::Delete {
                file_path: PathBuf::from("a.py")
            }
        );
    }

    #[test]
    fn update_serializes_wire_shape() {
        let action = FileAction::Update {
            file_path: PathBuf::from("/repo/a.py"),
            content: "print()".to_string(),
        };
        let value = serde_json::to_value(&action).expect("encode");
        assert_eq!(value["action"], "UPDATE");
        assert_eq!(value["file_path"], "/repo/a.py");
        assert_eq!(value["content"], "print()");
    }

    #[test]
    fn with_file_path_keeps_kind_and_content() {
        let action = FileAction::Create {
            file_path: PathBuf::from("a.py"),
            content: "x".to_string(),
        }
        .with_file_path(PathBuf::from("/repo/a.py"));
        assert_eq!(action.kind(), ActionKind::Create);
        assert_eq!(action.file_path(), Path::new("/repo/a.py"));
    }

    #[test]
    fn finding_accepts_suggestion_alias() {
        let finding: ReviewFinding =
            serde_json::from_str(r#"{"explanation":"e","suggestion":"s"}"#).expect("decode");
        assert_eq!(finding.fix_suggestion, "s");
    }

    #[test]
    fn finding_prefers_fix_suggestion_over_suggestion() {
        let finding: ReviewFinding = serde_json::from_str(
            r#"{"explanation":"e","suggestion":"loose","fix_suggestion":"exact"}"#,
        )
        .expect("decode");
        assert_eq!(finding.fix_suggestion, "exact");
    }

    #[test]
    fn role_serializes_lowercase() {
        let value = serde_json::to_value(Message::system("hi")).expect("encode");
        assert_eq!(value["role"], "system");
    }
}
