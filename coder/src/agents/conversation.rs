//! Conversational model client with structured-reply recovery.
//!
//! A [`Conversation`] owns one backend handle and one [`ConversationMemory`].
//! It is not meant to be shared: independent analyses either reset memory or
//! build a fresh conversation so no context leaks between them.

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::core::error::PipelineError;
use crate::core::memory::ConversationMemory;
use crate::core::reply::parse_structured_reply;
use crate::core::types::{Message, Role};
use crate::io::backend::ChatBackend;

/// Default retry budget for structured requests.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

pub struct Conversation<B: ChatBackend> {
    backend: B,
    memory: ConversationMemory,
}

impl<B: ChatBackend> Conversation<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            memory: ConversationMemory::new(),
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Add a user turn without asking the model anything.
    ///
    /// Used to teach context the model must absorb but not answer.
    pub fn send_silently(&mut self, content: impl Into<String>) {
        self.memory.push(Message::user(content));
        debug!(memory = self.memory.len(), "added silent turn");
    }

    /// Send a turn with the whole memory as context and return the reply text.
    ///
    /// The request and the reply are committed to memory together; a backend
    /// failure leaves memory as it was.
    pub fn send_message(&mut self, role: Role, content: impl Into<String>) -> Result<String> {
        let request = Message::new(role, content);
        let mut context = Vec::with_capacity(self.memory.len() + 1);
        context.extend_from_slice(self.memory.messages());
        context.push(request.clone());

        let reply = self.backend.complete(&context)?;
        let text = reply.content.clone();
        self.memory.push(request);
        self.memory.push(reply);
        debug!(memory = self.memory.len(), reply_bytes = text.len(), "received reply");
        Ok(text)
    }

    /// Send a user turn whose reply must be JSON, retrying on unparseable replies.
    ///
    /// Makes at most `max_attempts + 1` calls. Each failed exchange is rolled
    /// back out of memory before the next try, so only the successful exchange
    /// persists. Exhausting the budget yields [`PipelineError::ReplyUnparseable`].
    #[instrument(skip_all, fields(max_attempts = max_attempts))]
    pub fn send_message_expecting_json(&mut self, content: &str, max_attempts: u32) -> Result<Value> {
        let total = max_attempts.saturating_add(1);
        let mut last_reply = String::new();
        for attempt in 1..=total {
            let reply = self.send_message(Role::User, content)?;
            match parse_structured_reply(&reply) {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, total, "structured reply recovered");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    error!(attempt, total, err = %err, raw = %reply, "reply is not valid JSON");
                    self.memory.rollback_last_two();
                    if attempt < total {
                        warn!(remaining = total - attempt, "retrying structured request");
                    }
                    last_reply = reply;
                }
            }
        }
        Err(PipelineError::ReplyUnparseable {
            attempts: total,
            last_reply,
        }
        .into())
    }

    pub fn reset_memory(&mut self) {
        self.memory.reset();
        info!("conversation memory reset");
    }
}
