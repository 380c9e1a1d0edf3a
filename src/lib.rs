//! strategen: trading-rule DSL compiler.
//!
//! Natural language or JSON conditions become DSL text, DSL text is parsed
//! and normalized into an AST, and the AST is rendered as a pandas backtest
//! program.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
