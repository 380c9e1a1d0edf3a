//! Indicator references and their translation to target-language expressions.
//!
//! Classification is where indicator text gets meaning: `sma`, `ema` and `rsi`
//! match case-insensitively, `macd()` after lowercasing, and OHLCV columns
//! exactly. Anything else is `Unrecognized` and passes through verbatim.

use std::fmt;

use crate::domain::ast::{Ast, Value};
use crate::domain::grammar::BASE_INDICATORS;

/// Fast, slow and signal spans used by `macd()`.
pub const MACD_SPANS: (u32, u32, u32) = (12, 26, 9);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorRef {
    Column(String),
    Sma(u64),
    Ema(u64),
    Rsi(u64),
    Macd,
    Unrecognized(String),
}

impl IndicatorRef {
    pub fn classify(text: &str) -> Self {
        let text = text.trim();

        if BASE_INDICATORS.contains(&text) {
            return IndicatorRef::Column(text.to_string());
        }

        if let Some(period) = period_call(text, "sma") {
            return IndicatorRef::Sma(period);
        }
        if let Some(period) = period_call(text, "ema") {
            return IndicatorRef::Ema(period);
        }
        if let Some(period) = period_call(text, "rsi") {
            return IndicatorRef::Rsi(period);
        }

        if text.to_lowercase() == "macd()" {
            return IndicatorRef::Macd;
        }

        IndicatorRef::Unrecognized(text.to_string())
    }

    /// Target-language expression for the most recent value in a data window `df`.
    pub fn translate(&self) -> String {
        match self {
            IndicatorRef::Column(name) => format!("df['{}'].iloc[-1]", name),
            IndicatorRef::Sma(period) => {
                format!("df['close'].rolling({}).mean().iloc[-1]", period)
            }
            IndicatorRef::Ema(period) => {
                format!("df['close'].ewm(span={}, adjust=False).mean().iloc[-1]", period)
            }
            IndicatorRef::Rsi(period) => {
                format!("calculate_rsi(df['close'], {}).iloc[-1]", period)
            }
            IndicatorRef::Macd => "calculate_macd(df['close']).iloc[-1]".to_string(),
            IndicatorRef::Unrecognized(text) => text.clone(),
        }
    }
}

/// `name(N)`, name matched case-insensitively, N a non-negative integer.
fn period_call(text: &str, name: &str) -> Option<u64> {
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let digits = text[name.len()..].strip_prefix('(')?.strip_suffix(')')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Translate an expression operand: numbers render as literals, indicator
/// text through [`IndicatorRef::classify`].
pub fn translate_value(value: &Value) -> String {
    match value {
        Value::Int(_) | Value::Float(_) => value.to_string(),
        Value::Indicator(text) => IndicatorRef::classify(text).translate(),
    }
}

/// Distinct indicator references in an AST, in first-seen order. Numeric
/// operands are not references and are skipped.
pub fn referenced_indicators(ast: &Ast) -> Vec<IndicatorRef> {
    let mut seen = Vec::new();
    for rule in ast.entry.iter().chain(&ast.exit) {
        let operands = [
            Some(rule.expression.indicator.as_str()),
            match &rule.expression.value {
                Value::Indicator(text) => Some(text.as_str()),
                _ => None,
            },
        ];
        for text in operands.into_iter().flatten() {
            let indicator = IndicatorRef::classify(text);
            if !seen.contains(&indicator) {
                seen.push(indicator);
            }
        }
    }
    seen
}

impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorRef::Column(name) => write!(f, "{}", name),
            IndicatorRef::Sma(period) => write!(f, "sma({})", period),
            IndicatorRef::Ema(period) => write!(f, "ema({})", period),
            IndicatorRef::Rsi(period) => write!(f, "rsi({})", period),
            IndicatorRef::Macd => write!(f, "macd()"),
            IndicatorRef::Unrecognized(text) => write!(f, "{}", text),
        }
    }
}
