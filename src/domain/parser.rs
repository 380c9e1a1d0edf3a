//! DSL parser.
//!
//! Recursive descent over the token stream from [`crate::domain::grammar`].
//! Produces a [`ParseTree`] or the first syntax error, with its byte offset;
//! no partial trees and no semantic checks.

use crate::domain::error::ParseError;
use crate::domain::grammar::{self, Token, TokenKind};
use crate::domain::parse_tree::{BlockNode, ExprNode, ParseTree, RuleNode, ValueNode};

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, tokens: Vec<Token<'a>>) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::at(
                self.input,
                token.position,
                format!("expected {}, found '{}'", expected, token.text),
            ),
            None => ParseError::at(
                self.input,
                self.input.len(),
                format!("expected {}, found end of input", expected),
            ),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>, ParseError> {
        match self.peek().copied() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(&kind.to_string())),
        }
    }

    fn expect_indicator(&mut self) -> Result<Token<'a>, ParseError> {
        match self.peek().copied() {
            Some(token) if matches!(token.kind, TokenKind::Indicator(_)) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected("indicator")),
        }
    }

    fn parse_value(&mut self) -> Result<ValueNode<'a>, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Number) => {
                let token = self.expect(TokenKind::Number)?;
                Ok(ValueNode::Number(token))
            }
            Some(TokenKind::Indicator(_)) => {
                let token = self.expect_indicator()?;
                Ok(ValueNode::Indicator(token))
            }
            _ => Err(self.unexpected("number or indicator")),
        }
    }

    fn parse_expr(&mut self) -> Result<ExprNode<'a>, ParseError> {
        let indicator = self.expect_indicator()?;
        let operator = self.expect(TokenKind::Operator)?;
        let value = self.parse_value()?;
        Ok(ExprNode {
            indicator,
            operator,
            value,
        })
    }

    fn parse_rule(&mut self) -> Result<RuleNode<'a>, ParseError> {
        let name = self.expect(TokenKind::RuleName)?;
        self.expect(TokenKind::Colon)?;
        let expr = self.parse_expr()?;
        let logic = if self.peek_kind() == Some(TokenKind::Logic) {
            self.advance()
        } else {
            None
        };
        Ok(RuleNode { name, expr, logic })
    }

    fn parse_rules(&mut self) -> Result<Vec<RuleNode<'a>>, ParseError> {
        let mut rules = Vec::new();
        while self.peek_kind() == Some(TokenKind::RuleName) {
            rules.push(self.parse_rule()?);
        }
        Ok(rules)
    }

    fn parse(&mut self) -> Result<ParseTree<'a>, ParseError> {
        let entry_header = self.expect(TokenKind::EntryHeader)?;
        let entry_rules = self.parse_rules()?;

        if self.peek_kind() != Some(TokenKind::ExitHeader) {
            return Err(self.unexpected("rule or 'EXIT:'"));
        }
        let exit_header = self.expect(TokenKind::ExitHeader)?;
        let exit_rules = self.parse_rules()?;

        if self.peek().is_some() {
            return Err(self.unexpected("rule or end of input"));
        }

        Ok(ParseTree {
            entry: BlockNode {
                header: entry_header,
                rules: entry_rules,
            },
            exit: BlockNode {
                header: exit_header,
                rules: exit_rules,
            },
        })
    }
}

/// Parse DSL text into a concrete parse tree.
pub fn parse(input: &str) -> Result<ParseTree<'_>, ParseError> {
    let tokens = grammar::tokenize(input)?;
    let mut parser = Parser::new(input, tokens);
    parser.parse()
}
