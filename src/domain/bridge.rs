//! JSON condition lists to DSL text, and back.
//!
//! The JSON form is what the text-generation service produces: per block, a
//! flat list of condition objects with logic objects interleaved between
//! them. Each condition maps to exactly one `RULE<n>` line and a logic object
//! is appended to the line of the condition before it. Nothing is reordered
//! or grouped.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::domain::ast::{Ast, Block, Expression, RuleRecord, Value};
use crate::domain::error::{BridgeError, ParseError};
use crate::domain::grammar::{self, ENTRY_HEADER, EXIT_HEADER};
use crate::domain::{normalizer, parser};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionDocument {
    pub entry: Vec<ConditionItem>,
    pub exit: Vec<ConditionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionItem {
    Condition(Condition),
    Logic(LogicItem),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub indicator: String,
    pub operator: String,
    pub value: Value,
}

/// `AND` or `OR`, stored upper-case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicItem {
    pub logic: String,
}

impl ConditionDocument {
    pub fn items(&self, block: Block) -> &[ConditionItem] {
        match block {
            Block::Entry => &self.entry,
            Block::Exit => &self.exit,
        }
    }

    pub fn condition_count(&self) -> usize {
        self.entry
            .iter()
            .chain(&self.exit)
            .filter(|item| matches!(item, ConditionItem::Condition(_)))
            .count()
    }

    pub fn from_json_str(text: &str) -> Result<Self, BridgeError> {
        let value: JsonValue =
            serde_json::from_str(text).map_err(|e| BridgeError::InvalidJson {
                reason: e.to_string(),
            })?;
        Self::from_value(&value)
    }

    /// Validate a decoded payload. A top-level array stands for its first
    /// element; the rest is ignored.
    pub fn from_value(value: &JsonValue) -> Result<Self, BridgeError> {
        let value = match value {
            JsonValue::Array(items) => items.first().ok_or(BridgeError::EmptyPayload)?,
            other => other,
        };
        let object = value.as_object().ok_or(BridgeError::NotAnObject)?;

        Ok(ConditionDocument {
            entry: read_block(object, Block::Entry)?,
            exit: read_block(object, Block::Exit)?,
        })
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

fn read_block(
    object: &Map<String, JsonValue>,
    block: Block,
) -> Result<Vec<ConditionItem>, BridgeError> {
    let name = block.name();
    let raw = match object.get(name) {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items,
        Some(_) => return Err(BridgeError::NotAList { block: name }),
    };

    let mut items = Vec::with_capacity(raw.len());
    for (index, item) in raw.iter().enumerate() {
        let item = read_item(item, name, index)?;
        if let ConditionItem::Logic(_) = item {
            match items.last() {
                None => return Err(BridgeError::DanglingLogic { block: name, index }),
                Some(ConditionItem::Logic(_)) => {
                    return Err(BridgeError::AdjacentLogic { block: name, index });
                }
                Some(ConditionItem::Condition(_)) => {}
            }
        }
        items.push(item);
    }
    Ok(items)
}

fn read_item(
    item: &JsonValue,
    block: &'static str,
    index: usize,
) -> Result<ConditionItem, BridgeError> {
    let invalid = |reason: &str| BridgeError::InvalidItem {
        block,
        index,
        reason: reason.to_string(),
    };

    let object = item
        .as_object()
        .ok_or_else(|| invalid("expected a condition or logic object"))?;

    if object.contains_key("indicator") {
        let indicator = object
            .get("indicator")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid("'indicator' must be a string"))?;
        let operator = object
            .get("operator")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid("'operator' must be a string"))?;
        let value = match object.get("value") {
            Some(JsonValue::String(s)) => Value::Indicator(s.clone()),
            Some(JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().ok_or_else(|| invalid("'value' is out of range"))?),
            },
            _ => return Err(invalid("'value' must be a number or an indicator string")),
        };
        return Ok(ConditionItem::Condition(Condition {
            indicator: indicator.to_string(),
            operator: operator.to_string(),
            value,
        }));
    }

    if let Some(logic) = object.get("logic") {
        let word = logic
            .as_str()
            .map(str::to_uppercase)
            .filter(|w| grammar::LOGIC_OPS.contains(&w.as_str()))
            .ok_or_else(|| invalid("'logic' must be \"AND\" or \"OR\""))?;
        return Ok(ConditionItem::Logic(LogicItem { logic: word }));
    }

    Err(invalid("expected a condition or logic object"))
}

/// Render a condition document as DSL text. Rule numbers restart at 1 in
/// each block; lines are joined with `\n` and there is no trailing newline.
pub fn json_to_dsl_text(document: &ConditionDocument) -> String {
    let mut lines = Vec::new();
    for (block, header) in [(Block::Entry, ENTRY_HEADER), (Block::Exit, EXIT_HEADER)] {
        lines.push(header.to_string());
        let mut rule_number = 1;
        for item in document.items(block) {
            match item {
                ConditionItem::Condition(c) => {
                    lines.push(format!(
                        "RULE{}: {} {} {}",
                        rule_number, c.indicator, c.operator, c.value
                    ));
                    rule_number += 1;
                }
                ConditionItem::Logic(l) => {
                    if let Some(line) = lines.last_mut() {
                        line.push(' ');
                        line.push_str(&l.logic);
                    }
                }
            }
        }
    }
    lines.join("\n")
}

/// Condition list form of an AST. A rule's `logic_op` becomes a logic object
/// after it, unless the rule is the last of its block.
pub fn ast_to_conditions(ast: &Ast) -> ConditionDocument {
    ConditionDocument {
        entry: rules_to_items(&ast.entry),
        exit: rules_to_items(&ast.exit),
    }
}

fn rules_to_items(rules: &[RuleRecord]) -> Vec<ConditionItem> {
    let mut items = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        let Expression {
            indicator,
            operator,
            value,
        } = &rule.expression;
        items.push(ConditionItem::Condition(Condition {
            indicator: indicator.clone(),
            operator: operator.clone(),
            value: value.clone(),
        }));
        if let Some(logic) = &rule.logic_op {
            if i + 1 < rules.len() {
                items.push(ConditionItem::Logic(LogicItem {
                    logic: logic.to_uppercase(),
                }));
            }
        }
    }
    items
}

/// Parse DSL text and render it in the condition list form.
pub fn dsl_to_json(text: &str) -> Result<ConditionDocument, ParseError> {
    let tree = parser::parse(text)?;
    Ok(ast_to_conditions(&normalizer::normalize(&tree)))
}
