//! Code review agent: asks for findings about the taught code.

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::schema::{ReplySchema, decode_reply};
use crate::core::types::ReviewFinding;
use crate::io::backend::ChatBackend;
use crate::io::prompt::Prompts;

use super::conversation::Conversation;

pub struct ReviewAgent {
    prompts: Prompts,
    max_attempts: u32,
}

impl ReviewAgent {
    pub fn new(max_attempts: u32) -> Result<Self> {
        Ok(Self {
            prompts: Prompts::new()?,
            max_attempts,
        })
    }

    /// Review whatever the conversation has been taught.
    ///
    /// A clean file yields an empty list.
    #[instrument(skip_all)]
    pub fn review<B: ChatBackend>(
        &self,
        conversation: &mut Conversation<B>,
    ) -> Result<Vec<ReviewFinding>> {
        let prompt = self.prompts.review()?;
        let reply = conversation.send_message_expecting_json(&prompt, self.max_attempts)?;
        let findings: Vec<ReviewFinding> = decode_reply(ReplySchema::ReviewFindings, reply)?;
        info!(findings = findings.len(), "review complete");
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    #[test]
    fn empty_array_yields_no_findings() {
        let backend = ScriptedBackend::new(["[]"]);
        let mut conversation = Conversation::new(&backend);
        let findings = ReviewAgent::new(3)
            .expect("agent")
            .review(&mut conversation)
            .expect("review");
        assert!(findings.is_empty());
    }

    #[test]
    fn findings_are_decoded_after_recovery() {
        let backend = ScriptedBackend::new([
            "Here is my review:",
            r#"```json
[{"explanation": "division by zero", "suggestion": "check b"}]
```"#,
        ]);
        let mut conversation = Conversation::new(&backend);
        let findings = ReviewAgent::new(3)
            .expect("agent")
            .review(&mut conversation)
            .expect("review");
        assert_eq!(
            findings,
            vec![ReviewFinding {
                explanation: "division by zero".to_string(),
                fix_suggestion: "check b".to_string(),
            }]
        );
        assert_eq!(conversation.memory().len(), 2);
    }
}
