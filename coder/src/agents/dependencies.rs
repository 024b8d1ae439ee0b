//! Dependency discovery: asks which repository files a source file uses.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::schema::{ReplySchema, decode_reply};
use crate::io::backend::ChatBackend;
use crate::io::prompt::Prompts;

use super::conversation::Conversation;

pub struct DependencyAgent {
    prompts: Prompts,
    max_attempts: u32,
}

impl DependencyAgent {
    pub fn new(max_attempts: u32) -> Result<Self> {
        Ok(Self {
            prompts: Prompts::new()?,
            max_attempts,
        })
    }

    /// Return the absolute paths of in-repository files `file_path` depends on.
    ///
    /// Paths are returned as the model gave them, in order; nothing is
    /// deduplicated or rewritten.
    #[instrument(skip_all, fields(file = %file_path.display()))]
    pub fn find_dependencies<B: ChatBackend>(
        &self,
        conversation: &mut Conversation<B>,
        file_path: &Path,
        code: &str,
        repo_root: &Path,
    ) -> Result<Vec<String>> {
        info!(repo_root = %repo_root.display(), "finding dependencies");
        let prompt = self.prompts.dependencies(file_path, code, repo_root)?;
        let reply = conversation.send_message_expecting_json(&prompt, self.max_attempts)?;
        let dependencies: Vec<String> = decode_reply(ReplySchema::Dependencies, reply)?;
        info!(dependencies = dependencies.len(), "dependencies found");
        Ok(dependencies)
    }
}
