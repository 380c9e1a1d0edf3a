//! Normalized rule AST.
//!
//! - `Ast`: the `entry` and `exit` rule lists of one document
//! - `RuleRecord`: one rule line, with the connective to the next rule
//! - `Expression`: `indicator operator value`
//! - `Value`: a numeric literal or an indicator reference
//!
//! Indicator references and operators are opaque strings here; meaning is
//! assigned by [`crate::domain::codegen`]. The serde shape is the JSON form
//! printed by the CLI and embedded in generated programs.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    #[serde(default)]
    pub entry: Vec<RuleRecord>,
    #[serde(default)]
    pub exit: Vec<RuleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub rule_name: String,
    pub expression: Expression,
    /// How this rule joins the next one; unused on the last rule of a block.
    #[serde(default)]
    pub logic_op: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub indicator: String,
    pub operator: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Indicator(String),
}

/// The two rule blocks of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    Entry,
    Exit,
}

impl Block {
    pub const ALL: [Block; 2] = [Block::Entry, Block::Exit];

    pub fn name(self) -> &'static str {
        match self {
            Block::Entry => "entry",
            Block::Exit => "exit",
        }
    }
}

impl Ast {
    pub fn rules(&self, block: Block) -> &[RuleRecord] {
        match block {
            Block::Entry => &self.entry,
            Block::Exit => &self.exit,
        }
    }

    pub fn rule_count(&self) -> usize {
        self.entry.len() + self.exit.len()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Compact single-line JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

/// Numbers render as literals (floats always keep a `.` or exponent),
/// indicator references verbatim.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Indicator(s) => write!(f, "{}", s),
        }
    }
}
