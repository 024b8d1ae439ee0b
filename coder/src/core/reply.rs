//! Parsing of free-text model replies that are supposed to carry JSON.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid fence regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?[ \t]*```$").expect("valid fence regex"));

/// Remove the markdown code fence models like to wrap structured payloads in.
///
/// Only a fence at the very start and one at the very end are removed; the
/// payload in between is left untouched.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let start = LEADING_FENCE.find(trimmed).map_or(0, |m| m.end());
    let rest = &trimmed[start..];
    let end = TRAILING_FENCE.find(rest).map_or(rest.len(), |m| m.start());
    rest[..end].trim()
}

/// Parse a reply as JSON after stripping code fences.
pub fn parse_structured_reply(text: &str) -> Result<Value> {
    serde_json::from_str(strip_code_fences(text)).context("parse model reply as json")
}
