//! Model backend abstraction.
//!
//! The [`ChatBackend`] trait is the only seam between conversation logic and a
//! concrete model API. It takes the whole message history and returns the
//! assistant's reply; request shapes stay private to each backend. Tests use
//! scripted backends that return queued replies without network access.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::core::types::{Message, Role};
use crate::io::config::ModelConfig;

/// Abstraction over chat-completion backends.
pub trait ChatBackend {
    /// Send the full conversation and return the model's reply.
    fn complete(&self, messages: &[Message]) -> Result<Message>;
}

impl<B: ChatBackend + ?Sized> ChatBackend for &B {
    fn complete(&self, messages: &[Message]) -> Result<Message> {
        (**self).complete(messages)
    }
}

/// Backend for OpenAI-compatible `/chat/completions` endpoints (blocking).
#[derive(Clone)]
pub struct OpenAiChatBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl std::fmt::Debug for OpenAiChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatBackend {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Build a backend reading the API key from the variable named in `config`.
    pub fn from_env(config: &ModelConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env)
            .with_context(|| format!("read API key from ${}", config.api_key_env))?;
        Ok(Self::new(config, api_key))
    }

    fn request_body<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        }
    }
}

impl ChatBackend for OpenAiChatBackend {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    fn complete(&self, messages: &[Message]) -> Result<Message> {
        debug!(endpoint = %self.endpoint, "sending chat completion");
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(self.request_body(messages));

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!(status = code, "chat completion rejected");
                return Err(anyhow!("chat completion failed with status {code}: {body}"));
            }
            Err(err) => return Err(anyhow!("send chat completion: {err}")),
        };

        let payload: ChatResponse = response
            .into_json()
            .context("decode chat completion response")?;
        reply_from_response(payload)
    }
}

fn reply_from_response(payload: ChatResponse) -> Result<Message> {
    let choice = payload
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("chat completion returned no choices"))?;
    Ok(Message::new(
        Role::Assistant,
        choice.message.content.unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OpenAiChatBackend {
        let config = ModelConfig {
            base_url: "http://localhost:9/v1/".to_string(),
            temperature: Some(0.0),
            ..ModelConfig::default()
        };
        OpenAiChatBackend::new(&config, "sk-secret")
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(backend().endpoint, "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_full_history() {
        let backend = backend();
        let messages = vec![Message::user("teach"), Message::user("ask")];
        let body = serde_json::to_value(backend.request_body(&messages)).expect("encode");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn reply_uses_first_choice() {
        let payload: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"[]"}}]}"#,
        )
        .expect("decode");
        let reply = reply_from_response(payload).expect("reply");
        assert_eq!(reply, Message::assistant("[]"));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let payload: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("decode");
        assert!(reply_from_response(payload).is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        assert!(!format!("{:?}", backend()).contains("sk-secret"));
    }
}
