//! Feature coding agent: teaches a snapshot, then asks for file actions.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::path::rebase_under_root;
use crate::core::schema::{ReplySchema, decode_reply};
use crate::core::types::{FileAction, Snapshot};
use crate::io::backend::ChatBackend;
use crate::io::prompt::Prompts;

use super::conversation::Conversation;

/// Coding agent wrapper that owns prompts and the retry budget.
pub struct CodingAgent {
    prompts: Prompts,
    max_attempts: u32,
}

impl CodingAgent {
    pub fn new(max_attempts: u32) -> Result<Self> {
        Ok(Self {
            prompts: Prompts::new()?,
            max_attempts,
        })
    }

    /// Push the whole snapshot into memory as one silent turn.
    #[instrument(skip_all, fields(files = snapshot.len()))]
    pub fn teach<B: ChatBackend>(
        &self,
        conversation: &mut Conversation<B>,
        snapshot: &Snapshot,
    ) -> Result<()> {
        let payload = self.prompts.teach(snapshot)?;
        conversation.send_silently(payload);
        info!("taught snapshot to the model");
        Ok(())
    }

    /// Ask for the file actions implementing `task`, rooted under `repo_root`.
    ///
    /// The batch is rejected as a whole if any item has the wrong shape.
    #[instrument(skip_all, fields(repo_root = %repo_root.display()))]
    pub fn code_feature<B: ChatBackend>(
        &self,
        conversation: &mut Conversation<B>,
        task: &str,
        repo_root: &Path,
    ) -> Result<Vec<FileAction>> {
        info!(task = %task.trim(), "asking the model to code the feature");
        let prompt = self.prompts.code_feature(task, repo_root)?;
        let reply = conversation.send_message_expecting_json(&prompt, self.max_attempts)?;
        let actions: Vec<FileAction> = decode_reply(ReplySchema::FileActions, reply)?;

        let actions: Vec<FileAction> = actions
            .into_iter()
            .map(|action| {
                let rooted = rebase_under_root(repo_root, &action.file_path().to_string_lossy());
                action.with_file_path(rooted)
            })
            .collect();
        info!(actions = actions.len(), "model proposed file actions");
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PipelineError;
    use crate::core::types::ActionKind;
    use crate::test_support::ScriptedBackend;
    use std::path::PathBuf;

    #[test]
    fn teach_adds_exactly_one_turn() {
        let backend = ScriptedBackend::new(Vec::<String>::new());
        let mut conversation = Conversation::new(&backend);
        let mut snapshot = Snapshot::new("/repo/x");
        snapshot.insert(PathBuf::from("/repo/x/a.py"), "a".to_string());
        snapshot.insert(PathBuf::from("/repo/x/b.py"), "b".to_string());

        let agent = CodingAgent::new(1).expect("agent");
        agent.teach(&mut conversation, &snapshot).expect("teach");

        assert_eq!(conversation.memory().len(), 1);
        assert_eq!(backend.call_count(), 0);
        let taught = &conversation.memory().messages()[0].content;
        assert!(taught.contains("/repo/x/a.py") && taught.contains("/repo/x/b.py"));
    }

    #[test]
    fn code_feature_roots_every_path() {
        let reply = r#"```json
[
  {"file_path": "/repo/x/src/app.py", "content": "v2", "action": "UPDATE"},
  {"file_path": "src/app.py", "content": "v2", "action": "UPDATE"},
  {"file_path": "EXPLANATION.md", "content": "why", "action": "CREATE"},
  {"file_path": "/repo/x/old.py", "action": "DELETE"}
]
```"#;
        let backend = ScriptedBackend::new([reply]);
        let mut conversation = Conversation::new(&backend);
        let agent = CodingAgent::new(2).expect("agent");

        let actions = agent
            .code_feature(&mut conversation, "add a feature", Path::new("/repo/x"))
            .expect("code");

        assert_eq!(actions.len(), 4);
        assert_eq!(actions[0].file_path(), actions[1].file_path());
        assert_eq!(actions[0].file_path(), Path::new("/repo/x/src/app.py"));
        assert_eq!(actions[2].file_path(), Path::new("/repo/x/EXPLANATION.md"));
        assert_eq!(actions[3].kind(), ActionKind::Delete);
        assert_eq!(actions[3].file_path(), Path::new("/repo/x/old.py"));
        let request = backend.request(0).expect("request");
        assert!(request.content.contains("add a feature"));
    }

    #[test]
    fn schema_violation_is_not_retried() {
        let backend = ScriptedBackend::repeating(
            r#"[{"file_path": "a.py", "content": "x", "action": "CREATE"}, {"path": "b.py"}]"#,
        );
        let mut conversation = Conversation::new(&backend);
        let agent = CodingAgent::new(5).expect("agent");

        let err = agent
            .code_feature(&mut conversation, "task", Path::new("/repo/x"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::SchemaViolation { .. })
        ));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn unparseable_replies_surface_after_budget() {
        let backend = ScriptedBackend::repeating("I changed app.py for you!");
        let mut conversation = Conversation::new(&backend);
        let agent = CodingAgent::new(2).expect("agent");

        let err = agent
            .code_feature(&mut conversation, "task", Path::new("/repo/x"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ReplyUnparseable { attempts: 3, .. })
        ));
        assert!(conversation.memory().is_empty());
    }
}
