//! End-to-end compilation: query or JSON or DSL text to a generated program.
//!
//! Stages run strictly one after another and each consumes the previous
//! stage's output whole. Every entry point builds its own parse tree and AST;
//! nothing is shared between runs.

use std::fmt;

use tracing::{debug, info};

use crate::domain::ast::Ast;
use crate::domain::bridge::{self, ConditionDocument};
use crate::domain::codegen::{self, BacktestSettings, GenerationContext};
use crate::domain::error::{ParseError, StrategenError};
use crate::domain::{normalizer, parser};
use crate::ports::translator_port::TranslatorPort;

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStrategy {
    pub query: String,
    pub dsl_text: String,
    pub ast: Ast,
    pub program: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Translate,
    RenderDsl,
    Parse,
    Normalize,
    Generate,
}

impl Stage {
    pub fn number(self) -> usize {
        match self {
            Stage::Translate => 1,
            Stage::RenderDsl => 2,
            Stage::Parse => 3,
            Stage::Normalize => 4,
            Stage::Generate => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Translate => "Generating JSON",
            Stage::RenderDsl => "Converting to DSL",
            Stage::Parse => "Parsing DSL",
            Stage::Normalize => "Building AST",
            Stage::Generate => "Generating code",
        };
        write!(f, "{}", label)
    }
}

/// DSL text to AST.
pub fn parse_dsl(text: &str) -> Result<Ast, ParseError> {
    let tree = parser::parse(text)?;
    let ast = normalizer::normalize(&tree);
    debug!(
        entry_rules = ast.entry.len(),
        exit_rules = ast.exit.len(),
        "parsed DSL"
    );
    Ok(ast)
}

pub fn compile_dsl(
    dsl_text: &str,
    query: &str,
    settings: &BacktestSettings,
) -> Result<CompiledStrategy, StrategenError> {
    compile_dsl_with_progress(dsl_text, query, settings, &mut |_| {})
}

pub fn compile_conditions(
    document: &ConditionDocument,
    query: &str,
    settings: &BacktestSettings,
) -> Result<CompiledStrategy, StrategenError> {
    compile_conditions_with_progress(document, query, settings, &mut |_| {})
}

/// Validate a decoded JSON condition payload and compile it.
pub fn compile_json(
    value: &serde_json::Value,
    query: &str,
    settings: &BacktestSettings,
) -> Result<CompiledStrategy, StrategenError> {
    let document = ConditionDocument::from_value(value)?;
    compile_conditions(&document, query, settings)
}

/// Full run: natural-language query through the translator to a program.
pub fn run(
    translator: &dyn TranslatorPort,
    query: &str,
    settings: &BacktestSettings,
) -> Result<CompiledStrategy, StrategenError> {
    run_with_progress(translator, query, settings, &mut |_| {})
}

/// [`run`], reporting each stage to `progress` before it starts.
pub fn run_with_progress(
    translator: &dyn TranslatorPort,
    query: &str,
    settings: &BacktestSettings,
    progress: &mut dyn FnMut(Stage),
) -> Result<CompiledStrategy, StrategenError> {
    progress(Stage::Translate);
    let reply = translator.translate(query)?;
    info!(query_len = query.len(), "translator replied");

    let document = ConditionDocument::from_value(&reply)?;
    compile_conditions_with_progress(&document, query, settings, progress)
}

fn compile_conditions_with_progress(
    document: &ConditionDocument,
    query: &str,
    settings: &BacktestSettings,
    progress: &mut dyn FnMut(Stage),
) -> Result<CompiledStrategy, StrategenError> {
    progress(Stage::RenderDsl);
    let dsl_text = bridge::json_to_dsl_text(document);
    debug!(
        conditions = document.condition_count(),
        dsl_len = dsl_text.len(),
        "rendered DSL"
    );
    compile_dsl_with_progress(&dsl_text, query, settings, progress)
}

fn compile_dsl_with_progress(
    dsl_text: &str,
    query: &str,
    settings: &BacktestSettings,
    progress: &mut dyn FnMut(Stage),
) -> Result<CompiledStrategy, StrategenError> {
    progress(Stage::Parse);
    let tree = parser::parse(dsl_text)?;

    progress(Stage::Normalize);
    let ast = normalizer::normalize(&tree);
    debug!(
        entry_rules = ast.entry.len(),
        exit_rules = ast.exit.len(),
        "built AST"
    );

    progress(Stage::Generate);
    let program = codegen::generate_program(&GenerationContext {
        ast: &ast,
        query,
        dsl_text,
        settings,
    });
    debug!(program_len = program.len(), "generated program");

    Ok(CompiledStrategy {
        query: query.to_string(),
        dsl_text: dsl_text.to_string(),
        ast,
        program,
    })
}
