//! Parse tree to AST transform.
//!
//! A structural mapping: terminals become strings verbatim (no case folding),
//! numeric literals become `Int` unless they carry a fraction or exponent
//! marker, and rule order is preserved. Nothing is reordered, deduplicated or
//! validated.

use crate::domain::ast::{Ast, Expression, RuleRecord, Value};
use crate::domain::parse_tree::{BlockNode, ExprNode, ParseTree, RuleNode, ValueNode};

pub fn normalize(tree: &ParseTree<'_>) -> Ast {
    Ast {
        entry: normalize_block(&tree.entry),
        exit: normalize_block(&tree.exit),
    }
}

fn normalize_block(block: &BlockNode<'_>) -> Vec<RuleRecord> {
    block.rules.iter().map(normalize_rule).collect()
}

fn normalize_rule(rule: &RuleNode<'_>) -> RuleRecord {
    RuleRecord {
        rule_name: rule.name.text.to_string(),
        expression: normalize_expr(&rule.expr),
        logic_op: rule.logic.map(|t| t.text.to_string()),
    }
}

fn normalize_expr(expr: &ExprNode<'_>) -> Expression {
    Expression {
        indicator: expr.indicator.text.to_string(),
        operator: expr.operator.text.to_string(),
        value: normalize_value(&expr.value),
    }
}

fn normalize_value(value: &ValueNode<'_>) -> Value {
    match value {
        ValueNode::Number(token) => number_literal(token.text),
        ValueNode::Indicator(token) => Value::Indicator(token.text.to_string()),
    }
}

/// Integer unless the literal has `.`, `e` or `E`; integers too wide for
/// `i64` fall back to floating point.
pub fn number_literal(text: &str) -> Value {
    let is_float = text.contains(['.', 'e', 'E']);
    if !is_float {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Int(n);
        }
    }
    match text.parse::<f64>() {
        Ok(x) => Value::Float(x),
        Err(_) => Value::Indicator(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parser::parse;

    fn ast_of(input: &str) -> Ast {
        normalize(&parse(input).unwrap())
    }

    #[test]
    fn normalize_scenario() {
        let ast = ast_of("ENTRY:\nRULE1: close > sma(20)\nEXIT:\nRULE1: rsi(14) > 70");
        assert_eq!(
            ast.to_json(),
            r#"{"entry":[{"rule_name":"RULE1","expression":{"indicator":"close","operator":">","value":"sma(20)"},"logic_op":null}],"exit":[{"rule_name":"RULE1","expression":{"indicator":"rsi(14)","operator":">","value":70},"logic_op":null}]}"#
        );
    }

    #[test]
    fn normalize_empty_blocks() {
        let ast = ast_of("ENTRY:\nEXIT:");
        assert_eq!(ast, Ast::default());
    }

    #[test]
    fn logic_op_from_third_child() {
        let ast = ast_of("ENTRY:\nRULE1: close > 1 OR\nRULE2: close < 0\nEXIT:");
        assert_eq!(ast.entry[0].logic_op.as_deref(), Some("OR"));
        assert_eq!(ast.entry[1].logic_op, None);
    }

    #[test]
    fn order_preserved() {
        let ast = ast_of(
            "ENTRY:\nRULE3: high > 3 AND\nRULE1: low < 1 AND\nRULE2: open == 2\nEXIT:\nRULE2: volume != 0",
        );
        let names: Vec<&str> = ast.entry.iter().map(|r| r.rule_name.as_str()).collect();
        assert_eq!(names, vec!["RULE3", "RULE1", "RULE2"]);
        let indicators: Vec<&str> = ast
            .entry
            .iter()
            .map(|r| r.expression.indicator.as_str())
            .collect();
        assert_eq!(indicators, vec!["high", "low", "open"]);
        assert_eq!(ast.exit[0].expression.operator, "!=");
    }

    #[test]
    fn duplicates_kept() {
        let ast = ast_of("ENTRY:\nRULE1: close > 1\nRULE1: close > 1\nEXIT:");
        assert_eq!(ast.entry.len(), 2);
        assert_eq!(ast.entry[0], ast.entry[1]);
    }

    #[test]
    fn number_literal_int_vs_float() {
        assert_eq!(number_literal("70"), Value::Int(70));
        assert_eq!(number_literal("-3"), Value::Int(-3));
        assert_eq!(number_literal("70.0"), Value::Float(70.0));
        assert_eq!(number_literal("1."), Value::Float(1.0));
        assert_eq!(number_literal(".5"), Value::Float(0.5));
        assert_eq!(number_literal("1e3"), Value::Float(1000.0));
        assert_eq!(number_literal("2E-2"), Value::Float(0.02));
    }

    #[test]
    fn number_literal_overflow_falls_back_to_float() {
        assert_eq!(
            number_literal("100000000000000000000"),
            Value::Float(1e20)
        );
    }

    #[test]
    fn values_in_document() {
        let ast = ast_of("ENTRY:\nRULE1: close > 1.5\nRULE2: volume > 1000000\nEXIT:\nRULE1: close < ema(9)");
        assert_eq!(ast.entry[0].expression.value, Value::Float(1.5));
        assert_eq!(ast.entry[1].expression.value, Value::Int(1_000_000));
        assert_eq!(
            ast.exit[0].expression.value,
            Value::Indicator("ema(9)".into())
        );
    }
}
