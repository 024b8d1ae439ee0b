//! Shape validation for structured model replies.
//!
//! JSON syntax errors are handled by the retry loop in the conversation; this
//! module covers the second line: a syntactically valid reply of the wrong
//! shape. Such replies are rejected as a whole and never retried.

use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use jsonschema::{Draft, Validator};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::error::PipelineError;

const FILE_ACTIONS_SCHEMA: &str = include_str!("../../schemas/file_actions.schema.json");
const DEPENDENCIES_SCHEMA: &str = include_str!("../../schemas/dependencies.schema.json");
const REVIEW_FINDINGS_SCHEMA: &str = include_str!("../../schemas/review_findings.schema.json");

type CompiledSchema = LazyLock<Result<Validator, String>>;

static FILE_ACTIONS: CompiledSchema = LazyLock::new(|| compile(FILE_ACTIONS_SCHEMA));
static DEPENDENCIES: CompiledSchema = LazyLock::new(|| compile(DEPENDENCIES_SCHEMA));
static REVIEW_FINDINGS: CompiledSchema = LazyLock::new(|| compile(REVIEW_FINDINGS_SCHEMA));

fn compile(source: &str) -> Result<Validator, String> {
    let schema: Value = serde_json::from_str(source).map_err(|err| err.to_string())?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| err.to_string())
}

/// The three reply shapes the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySchema {
    FileActions,
    Dependencies,
    ReviewFindings,
}

impl ReplySchema {
    pub fn name(self) -> &'static str {
        match self {
            ReplySchema::FileActions => "file actions",
            ReplySchema::Dependencies => "dependencies",
            ReplySchema::ReviewFindings => "review findings",
        }
    }

    fn validator(self) -> Result<&'static Validator> {
        let compiled = match self {
            ReplySchema::FileActions => &FILE_ACTIONS,
            ReplySchema::Dependencies => &DEPENDENCIES,
            ReplySchema::ReviewFindings => &REVIEW_FINDINGS,
        };
        compiled
            .as_ref()
            .map_err(|err| anyhow!("compile {} schema: {}", self.name(), err))
    }
}

/// Validate `value` against `schema` and deserialize it into `T`.
pub fn decode_reply<T: DeserializeOwned>(schema: ReplySchema, value: Value) -> Result<T> {
    let details: Vec<String> = schema
        .validator()?
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !details.is_empty() {
        return Err(PipelineError::SchemaViolation {
            schema: schema.name(),
            details,
        }
        .into());
    }
    serde_json::from_value(value).map_err(|err| {
        PipelineError::SchemaViolation {
            schema: schema.name(),
            details: vec![err.to_string()],
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FileAction, ReviewFinding};
    use serde_json::json;

    fn schema_violation(err: &anyhow::Error) -> &[String] {
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::SchemaViolation { details, .. }) => details,
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[test]
    fn file_actions_decode() {
        let actions: Vec<FileAction> = decode_reply(
            ReplySchema::FileActions,
            json!([
                {"file_path": "a.py", "content": "x", "action": "CREATE"},
                {"file_path": "b.py", "action": "DELETE"}
            ]),
        )
        .expect("decode");
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn update_without_content_rejects_batch() {
        let err = decode_reply::<Vec<FileAction>>(
            ReplySchema::FileActions,
            json!([
                {"file_path": "a.py", "content": "x", "action": "CREATE"},
                {"file_path": "b.py", "action": "UPDATE"}
            ]),
        )
        .unwrap_err();
        assert!(!schema_violation(&err).is_empty());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = decode_reply::<Vec<FileAction>>(
            ReplySchema::FileActions,
            json!([{"file_path": "a.py", "content": "x", "action": "RENAME"}]),
        )
        .unwrap_err();
        assert!(!schema_violation(&err).is_empty());
    }

    #[test]
    fn object_instead_of_array_is_rejected() {
        let err =
            decode_reply::<Vec<String>>(ReplySchema::Dependencies, json!({"deps": []})).unwrap_err();
        assert!(!schema_violation(&err).is_empty());
    }

    #[test]
    fn findings_accept_either_suggestion_key() {
        let findings: Vec<ReviewFinding> = decode_reply(
            ReplySchema::ReviewFindings,
            json!([
                {"explanation": "a", "fix_suggestion": "b"},
                {"explanation": "c", "suggestion": "d"}
            ]),
        )
        .expect("decode");
        assert_eq!(findings[1].fix_suggestion, "d");
    }

    #[test]
    fn finding_with_both_suggestion_keys_decodes() {
        let findings: Vec<ReviewFinding> = decode_reply(
            ReplySchema::ReviewFindings,
            json!([{"explanation": "a", "fix_suggestion": "b", "suggestion": "c"}]),
        )
        .expect("decode");
        assert_eq!(findings[0].fix_suggestion, "b");
    }

    #[test]
    fn every_schema_compiles_once() {
        for schema in [
            ReplySchema::FileActions,
            ReplySchema::Dependencies,
            ReplySchema::ReviewFindings,
        ] {
            let first = schema.validator().expect("compile");
            let second = schema.validator().expect("compile");
            assert!(std::ptr::eq(first, second));
        }
    }

    #[test]
    fn finding_without_suggestion_is_rejected() {
        let err = decode_reply::<Vec<ReviewFinding>>(
            ReplySchema::ReviewFindings,
            json!([{"explanation": "a"}]),
        )
        .unwrap_err();
        assert!(!schema_violation(&err).is_empty());
    }
}
