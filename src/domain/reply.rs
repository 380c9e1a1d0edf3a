//! Decoding of text-generation replies.
//!
//! Models tend to wrap JSON in markdown fences even when told not to, so the
//! reply is trimmed and stripped of `` ```json `` / `` ``` `` fences before it
//! is decoded.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::error::TranslatorError;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```json\s*|```$").unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

/// Trim the reply and remove line-leading `` ```json `` and line-ending
/// `` ``` `` fences.
pub fn strip_code_fences(reply: &str) -> String {
    CODE_FENCE.replace_all(reply.trim(), "").into_owned()
}

pub fn decode_reply(reply: &str) -> Result<serde_json::Value, TranslatorError> {
    let cleaned = strip_code_fences(reply);
    if cleaned.trim().is_empty() {
        return Err(TranslatorError::EmptyReply);
    }
    serde_json::from_str(&cleaned).map_err(|e| TranslatorError::MalformedReply {
        reason: e.to_string(),
        raw: reply.to_string(),
    })
}
