//! Core domain types and logic: the DSL compiler pipeline.

pub mod grammar;
pub mod parse_tree;
pub mod parser;
pub mod ast;
pub mod normalizer;
pub mod indicator;
pub mod codegen;
pub mod bridge;
pub mod reply;
pub mod pipeline;
pub mod config_validation;
pub mod error;
