//! Natural-language translation port trait.

use crate::domain::error::TranslatorError;

/// A text-generation backend that turns a trading idea in plain language
/// into the JSON condition schema (`{"entry": [...], "exit": [...]}`).
///
/// Implementations return the decoded reply as-is; validating it against the
/// schema is left to [`crate::domain::bridge`].
pub trait TranslatorPort {
    fn translate(&self, query: &str) -> Result<serde_json::Value, TranslatorError>;
}
