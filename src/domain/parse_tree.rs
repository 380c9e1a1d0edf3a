//! Concrete parse tree produced by [`crate::domain::parser`].
//!
//! One node type per grammar production. Terminals are kept as [`Token`]s so
//! every node still points back into the source text.

use std::fmt;

use crate::domain::grammar::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree<'a> {
    pub entry: BlockNode<'a>,
    pub exit: BlockNode<'a>,
}

/// An `ENTRY:` or `EXIT:` header and the rule lines under it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode<'a> {
    pub header: Token<'a>,
    pub rules: Vec<RuleNode<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleNode<'a> {
    pub name: Token<'a>,
    pub expr: ExprNode<'a>,
    pub logic: Option<Token<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode<'a> {
    pub indicator: Token<'a>,
    pub operator: Token<'a>,
    pub value: ValueNode<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode<'a> {
    Number(Token<'a>),
    Indicator(Token<'a>),
}

impl ValueNode<'_> {
    pub fn token(&self) -> &Token<'_> {
        match self {
            ValueNode::Number(t) | ValueNode::Indicator(t) => t,
        }
    }
}

/// Indented rendering, one production or terminal per line.
impl fmt::Display for ParseTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start")?;
        write_block(f, "entry", &self.entry)?;
        write_block(f, "exit", &self.exit)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, label: &str, block: &BlockNode<'_>) -> fmt::Result {
    writeln!(f, "  {}", label)?;
    for rule in &block.rules {
        writeln!(f, "    rule")?;
        writeln!(f, "      {}", rule.name.text)?;
        writeln!(f, "      expr")?;
        writeln!(f, "        indicator\t{}", rule.expr.indicator.text)?;
        writeln!(f, "        {}", rule.expr.operator.text)?;
        match &rule.expr.value {
            ValueNode::Number(t) => writeln!(f, "        value\t{}", t.text)?,
            ValueNode::Indicator(t) => {
                writeln!(f, "        value")?;
                writeln!(f, "          indicator\t{}", t.text)?;
            }
        }
        if let Some(logic) = &rule.logic {
            writeln!(f, "      {}", logic.text)?;
        }
    }
    Ok(())
}
