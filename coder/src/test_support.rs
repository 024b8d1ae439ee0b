//! Test-only helpers: a scripted model backend and a scratch repository.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::core::types::Message;
use crate::io::backend::ChatBackend;

/// Backend returning queued replies and recording every context it was sent.
pub struct ScriptedBackend {
    replies: RefCell<VecDeque<String>>,
    repeat: Option<String>,
    calls: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    /// Reply with `replies` in order; fail once they run out.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            repeat: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Reply with `reply` forever.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            repeat: Some(reply.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every message history passed to the backend, oldest call first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// The newest message of call `index` (the request itself).
    pub fn request(&self, index: usize) -> Option<Message> {
        self.calls
            .borrow()
            .get(index)
            .and_then(|call| call.last().cloned())
    }
}

impl ChatBackend for ScriptedBackend {
    fn complete(&self, messages: &[Message]) -> Result<Message> {
        self.calls.borrow_mut().push(messages.to_vec());
        let reply = self
            .replies
            .borrow_mut()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| anyhow!("scripted backend has no reply left"))?;
        Ok(Message::assistant(reply))
    }
}

/// Scratch repository in a temporary directory.
pub struct TestRepo {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        let root = std::path::absolute(dir.path().join("repo")).context("absolute root")?;
        fs::create_dir_all(&root).with_context(|| format!("create {}", root.display()))?;
        Ok(Self { _dir: dir, root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `rel` under the root, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        let path = self.root.join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}
