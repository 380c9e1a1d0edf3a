#![allow(dead_code)]

use serde_json::{Value, json};
use std::cell::RefCell;
use std::io::Write;
use strategen::domain::error::TranslatorError;
use strategen::ports::translator_port::TranslatorPort;

pub enum MockReply {
    Json(Value),
    Malformed(String),
    Status(u16, String),
}

/// Translator returning a canned reply and recording every query it sees.
pub struct MockTranslator {
    reply: MockReply,
    pub queries: RefCell<Vec<String>>,
}

impl MockTranslator {
    pub fn replying(value: Value) -> Self {
        Self {
            reply: MockReply::Json(value),
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn malformed(raw: &str) -> Self {
        Self {
            reply: MockReply::Malformed(raw.to_string()),
            queries: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            reply: MockReply::Status(status, body.to_string()),
            queries: RefCell::new(Vec::new()),
        }
    }
}

impl TranslatorPort for MockTranslator {
    fn translate(&self, query: &str) -> Result<Value, TranslatorError> {
        self.queries.borrow_mut().push(query.to_string());
        match &self.reply {
            MockReply::Json(value) => Ok(value.clone()),
            MockReply::Malformed(raw) => Err(TranslatorError::MalformedReply {
                reason: "expected value at line 1 column 1".to_string(),
                raw: raw.clone(),
            }),
            MockReply::Status(status, body) => Err(TranslatorError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

pub fn condition(indicator: &str, operator: &str, value: Value) -> Value {
    json!({"indicator": indicator, "operator": operator, "value": value})
}

pub fn logic(word: &str) -> Value {
    json!({"logic": word})
}

pub fn scenario_json() -> Value {
    json!({
        "entry": [condition("close", ">", json!("sma(20)"))],
        "exit": [condition("rsi(14)", ">", json!(70))]
    })
}

pub const SCENARIO_DSL: &str = "ENTRY:\nRULE1: close > sma(20)\nEXIT:\nRULE1: rsi(14) > 70";

pub const SCENARIO_AST: &str = r#"{"entry":[{"rule_name":"RULE1","expression":{"indicator":"close","operator":">","value":"sma(20)"},"logic_op":null}],"exit":[{"rule_name":"RULE1","expression":{"indicator":"rsi(14)","operator":">","value":70},"logic_op":null}]}"#;

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
