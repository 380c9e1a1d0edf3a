//! DSL token vocabulary and tokenizer.
//!
//! A document is `ENTRY:` followed by zero or more rule lines, then `EXIT:`
//! followed by zero or more rule lines:
//!
//! ```text
//! document  := "ENTRY:" rule* "EXIT:" rule*
//! rule      := RULE_NAME ":" expr LOGIC_OP?
//! expr      := indicator OP value
//! value     := NUMBER | indicator
//! indicator := BASE_INDICATOR | SMA | EMA | RSI | ATR | MACD
//! ```
//!
//! Whitespace, newlines included, is skipped between tokens. The tokenizer is
//! context-free; production structure is enforced by [`crate::domain::parser`].

use std::fmt;

use crate::domain::error::ParseError;

pub const ENTRY_HEADER: &str = "ENTRY:";
pub const EXIT_HEADER: &str = "EXIT:";

/// Bare OHLCV column names.
pub const BASE_INDICATORS: [&str; 5] = ["close", "open", "high", "low", "volume"];

/// Comparison operators, longest first so `>=` wins over `>`.
pub const OPERATORS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

pub const LOGIC_OPS: [&str; 2] = ["AND", "OR"];

/// Which indicator terminal matched. `sma`, `ema`, `rsi` and `atr` take a
/// single integer period; `macd` takes no arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorTerminal {
    Base,
    Sma,
    Ema,
    Rsi,
    Atr,
    Macd,
}

impl IndicatorTerminal {
    fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "sma" => Some(Self::Sma),
            "ema" => Some(Self::Ema),
            "rsi" => Some(Self::Rsi),
            "atr" => Some(Self::Atr),
            "macd" => Some(Self::Macd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EntryHeader,
    ExitHeader,
    RuleName,
    Colon,
    Indicator(IndicatorTerminal),
    Operator,
    Number,
    Logic,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::EntryHeader => write!(f, "'{}'", ENTRY_HEADER),
            TokenKind::ExitHeader => write!(f, "'{}'", EXIT_HEADER),
            TokenKind::RuleName => write!(f, "rule name"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Indicator(_) => write!(f, "indicator"),
            TokenKind::Operator => write!(f, "comparison operator"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::Logic => write!(f, "logic operator"),
        }
    }
}

/// A lexed terminal borrowing its text from the DSL source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the first character.
    pub position: usize,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn consume_digits(&mut self) -> usize {
        let mut digits = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            digits += 1;
        }
        digits
    }

    fn peek_word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .char_indices()
            .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn error(&self, position: usize, message: impl Into<String>) -> ParseError {
        ParseError::at(self.input, position, message)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.input[start..self.pos],
            position: start,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        if ch == ':' {
            self.advance();
            return Ok(Some(self.token(TokenKind::Colon, start)));
        }

        for op in OPERATORS {
            if self.consume_exact(op) {
                return Ok(Some(self.token(TokenKind::Operator, start)));
            }
        }

        if ch.is_ascii_digit() || ch == '.' || ch == '-' {
            return self.lex_number().map(Some);
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.lex_word().map(Some);
        }

        Err(self.error(start, format!("unexpected character '{}'", ch)))
    }

    /// `-? (INT ("." INT?)? | "." INT) ([eE] [+-]? INT)?`
    fn lex_number(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.pos;
        self.consume_exact("-");

        let int_digits = self.consume_digits();
        let mut frac_digits = 0;
        if self.consume_exact(".") {
            frac_digits = self.consume_digits();
        }
        if int_digits == 0 && frac_digits == 0 {
            return Err(self.error(start, "expected number"));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let exp_start = self.pos;
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if self.consume_digits() == 0 {
                return Err(self.error(exp_start, "malformed exponent in number"));
            }
        }

        Ok(self.token(TokenKind::Number, start))
    }

    fn lex_word(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.pos;
        let word = self.peek_word();
        self.pos += word.len();

        match word {
            "ENTRY" | "EXIT" if self.peek() == Some(':') => {
                self.advance();
                let kind = if word == "ENTRY" {
                    TokenKind::EntryHeader
                } else {
                    TokenKind::ExitHeader
                };
                return Ok(self.token(kind, start));
            }
            "AND" | "OR" => return Ok(self.token(TokenKind::Logic, start)),
            _ => {}
        }

        if is_rule_name(word) {
            return Ok(self.token(TokenKind::RuleName, start));
        }

        if BASE_INDICATORS.contains(&word) {
            return Ok(self.token(TokenKind::Indicator(IndicatorTerminal::Base), start));
        }

        if let Some(terminal) = IndicatorTerminal::from_function_name(word) {
            return self.lex_indicator_call(terminal, start);
        }

        Err(self.error(start, format!("unknown word '{}'", word)))
    }

    fn lex_indicator_call(
        &mut self,
        terminal: IndicatorTerminal,
        start: usize,
    ) -> Result<Token<'a>, ParseError> {
        let name = &self.input[start..self.pos];
        if !self.consume_exact("(") {
            return Err(self.error(self.pos, format!("expected '(' after '{}'", name)));
        }
        let digits = self.consume_digits();
        match terminal {
            IndicatorTerminal::Macd if digits > 0 => {
                return Err(self.error(start, format!("'{}' takes no arguments", name)));
            }
            IndicatorTerminal::Macd => {}
            _ if digits == 0 => {
                return Err(self.error(self.pos, format!("expected integer period in '{}('", name)));
            }
            _ => {}
        }
        if !self.consume_exact(")") {
            let found = self
                .peek()
                .map(|c| format!("'{}'", c))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(self.error(self.pos, format!("expected ')', found {}", found)));
        }
        Ok(self.token(TokenKind::Indicator(terminal), start))
    }
}

fn is_rule_name(word: &str) -> bool {
    word.strip_prefix("RULE")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

/// Split DSL text into tokens, failing on the first character no terminal accepts.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
