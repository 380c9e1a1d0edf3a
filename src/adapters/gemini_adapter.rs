//! Gemini `generateContent` translator adapter.
//!
//! Sends the query with a fixed system instruction describing the JSON
//! condition schema, joins the text parts of the first candidate, and decodes
//! them with [`crate::domain::reply::decode_reply`]. One blocking request per
//! query, no retries.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::config_validation::{
    self, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::domain::error::{StrategenError, TranslatorError};
use crate::domain::reply::decode_reply;
use crate::ports::config_port::ConfigPort;
use crate::ports::translator_port::TranslatorPort;

/// Environment variable consulted when `[translator] api_key` is absent.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const SYSTEM_INSTRUCTIONS: &str = r#"
You are an NLP-to-DSL converter for trading strategies.

Convert natural language trading rules into the following simple JSON format:

{
  "entry": [ ... ],
  "exit": [ ... ]
}

Each item inside "entry" or "exit" must be a condition object OR a logical connector.

A **condition object** has:
{
  "indicator": "<name or indicator function>",   # e.g., close, volume, sma(20), rsi(14)
  "operator": ">", "<", ">=", "<=", "==", "!=",
  "value": <number or indicator>                 # e.g., 1000000 or sma(20)
}

A **logical operator object** has:
{
  "logic": "AND"  or  "OR"
}

Rules must appear in the sequence they are spoken.
Do NOT nest groups.
Do NOT create complex Boolean trees.
Just represent the flow using alternating condition + logic + condition.

Allowed indicators:
- close
- open
- high
- low
- volume
- sma(<period>)
- ema(<period>)
- rsi(<period>)
- macd()
- atr(<period>)

ALWAYS RETURN ONLY PURE JSON.
NO explanations, NO markdown, NO extra text.
"#;

#[derive(Clone, PartialEq)]
pub struct TranslatorSettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl fmt::Debug for TranslatorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TranslatorSettings {
    /// Read and validate the `[translator]` section. `env_api_key` is used
    /// when the file has no `api_key`.
    pub fn from_config(
        config: &dyn ConfigPort,
        env_api_key: Option<String>,
    ) -> Result<Self, StrategenError> {
        config_validation::validate_translator_config(config)?;

        let api_key = config
            .get_string("translator", "api_key")
            .filter(|k| !k.trim().is_empty())
            .or(env_api_key.filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| StrategenError::ConfigMissing {
                section: "translator".to_string(),
                key: "api_key".to_string(),
            })?;

        let model = config
            .get_string("translator", "model")
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let endpoint = config
            .get_string("translator", "endpoint")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout_secs = config.get_int("translator", "timeout_secs", DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            model: model.trim().to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs.unsigned_abs()),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiAdapter {
    client: reqwest::blocking::Client,
    settings: TranslatorSettings,
}

impl GeminiAdapter {
    pub fn new(settings: TranslatorSettings) -> Result<Self, TranslatorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| TranslatorError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self { client, settings })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint, self.settings.model
        )
    }

    fn request_body(query: &str) -> GenerateRequest<'_> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTIONS,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: query }],
            }],
        }
    }

    /// Concatenated text parts of the first candidate.
    fn reply_text(response: GenerateResponse) -> Result<String, TranslatorError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(TranslatorError::EmptyReply);
        }
        Ok(text)
    }
}

impl TranslatorPort for GeminiAdapter {
    fn translate(&self, query: &str) -> Result<serde_json::Value, TranslatorError> {
        debug!(model = %self.settings.model, query_len = query.len(), "sending translation request");

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&Self::request_body(query))
            .send()
            .map_err(|e| TranslatorError::Transport {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            warn!(status = status.as_u16(), "translator request rejected");
            return Err(TranslatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: GenerateResponse = resp.json().map_err(|e| TranslatorError::Transport {
            reason: format!("unreadable response: {}", e),
        })?;
        let text = Self::reply_text(response)?;
        debug!(reply_len = text.len(), "translator reply received");
        decode_reply(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use serde_json::json;

    fn settings() -> TranslatorSettings {
        TranslatorSettings {
            api_key: "secret-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64),
        }
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(GeminiAdapter::request_body("buy when rsi < 30")).unwrap();
        assert_eq!(
            body["contents"],
            json!([{"role": "user", "parts": [{"text": "buy when rsi < 30"}]}])
        );
        assert_eq!(body["system_instruction"]["parts"][0]["text"], SYSTEM_INSTRUCTIONS);
        assert!(body["system_instruction"].get("role").is_none());
    }

    #[test]
    fn url_uses_model_and_endpoint() {
        let adapter = GeminiAdapter::new(settings()).unwrap();
        assert_eq!(
            adapter.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn reply_text_joins_parts_of_first_candidate() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "```json\n{\"entry\":"}, {"text": " []}\n```"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        let text = GeminiAdapter::reply_text(response).unwrap();
        assert_eq!(text, "```json\n{\"entry\": []}\n```");
        assert_eq!(decode_reply(&text).unwrap(), json!({"entry": []}));
    }

    #[test]
    fn reply_without_candidates_is_empty() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            GeminiAdapter::reply_text(response).unwrap_err(),
            TranslatorError::EmptyReply
        ));
        let response: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(matches!(
            GeminiAdapter::reply_text(response).unwrap_err(),
            TranslatorError::EmptyReply
        ));
    }

    #[test]
    fn settings_from_config_with_defaults() {
        let config = FileConfigAdapter::from_string("[translator]\napi_key = abc\n").unwrap();
        let settings = TranslatorSettings::from_config(&config, None).unwrap();
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn settings_fall_back_to_env_key() {
        let config = FileConfigAdapter::from_string(
            "[translator]\nmodel = gemini-2.0-flash\nendpoint = http://localhost:9000/v1/\ntimeout_secs = 5\n",
        )
        .unwrap();
        let settings =
            TranslatorSettings::from_config(&config, Some("from-env".to_string())).unwrap();
        assert_eq!(settings.api_key, "from-env");
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.endpoint, "http://localhost:9000/v1");
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_api_key() {
        let config = FileConfigAdapter::empty();
        let err = TranslatorSettings::from_config(&config, Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, StrategenError::ConfigMissing { ref key, .. } if key == "api_key"));
    }

    #[test]
    fn invalid_translator_config_rejected() {
        let config = FileConfigAdapter::from_string("[translator]\nendpoint = ftp://x\n").unwrap();
        let err = TranslatorSettings::from_config(&config, Some("k".to_string())).unwrap_err();
        assert!(matches!(err, StrategenError::ConfigInvalid { .. }));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", settings());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
