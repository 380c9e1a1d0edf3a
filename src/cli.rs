//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::file_config_adapter::FileConfigAdapter;
#[cfg(feature = "gemini")]
use crate::adapters::gemini_adapter::{API_KEY_ENV, GeminiAdapter, TranslatorSettings};
use crate::domain::bridge::{self, ConditionDocument};
use crate::domain::codegen::BacktestSettings;
use crate::domain::config_validation::validate_backtest_config;
use crate::domain::error::{ParseError, StrategenError};
use crate::domain::indicator::{IndicatorRef, referenced_indicators};
use crate::domain::pipeline::{self, CompiledStrategy};
use crate::domain::parser;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(
    name = "strategen",
    about = "Compile trading rules into backtest programs"
)]
pub struct Cli {
    /// Log pipeline stages at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// INI file with [translator] and [backtest] sections
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate a natural-language query and generate a backtest program
    Translate {
        /// Query text; read from stdin when omitted
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, default_value = "simulator.py")]
        output: PathBuf,
    },
    /// Generate a program from a JSON condition file
    Build {
        #[arg(short, long)]
        json: PathBuf,
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a program from a DSL file
    Compile {
        #[arg(short, long)]
        dsl: PathBuf,
        #[arg(short, long, default_value = "")]
        query: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the AST of a DSL file as JSON
    Parse {
        #[arg(short, long)]
        dsl: PathBuf,
        /// Print the parse tree instead of the AST
        #[arg(long)]
        tree: bool,
    },
    /// Convert a JSON condition file to DSL text
    ToDsl {
        #[arg(short, long)]
        json: PathBuf,
    },
    /// Convert a DSL file to the JSON condition form
    ToJson {
        #[arg(short, long)]
        dsl: PathBuf,
    },
    /// Check a DSL file for syntax errors
    Validate {
        #[arg(short, long)]
        dsl: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    let config = cli.config.as_ref();

    match cli.command {
        Command::Translate { query, output } => run_translate(config, query, &output),
        Command::Build {
            json,
            query,
            output,
        } => run_build(config, &json, &query, output.as_ref()),
        Command::Compile { dsl, query, output } => {
            run_compile(config, &dsl, &query, output.as_ref())
        }
        Command::Parse { dsl, tree } => run_parse(&dsl, tree),
        Command::ToDsl { json } => run_to_dsl(&json),
        Command::ToJson { dsl } => run_to_json(&dsl),
        Command::Validate { dsl } => run_validate(&dsl),
    }
}

/// Install the stderr log subscriber. `RUST_LOG` applies unless `verbose`
/// forces debug; otherwise the level is `warn`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init();
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, ExitCode> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = StrategenError::ConfigParse {
            file: path.display().to_string(),
            reason: e,
        };
        fail(&err)
    })
}

/// Validated `[backtest]` values, defaults for anything absent.
pub fn build_backtest_settings(config: &dyn ConfigPort) -> Result<BacktestSettings, StrategenError> {
    validate_backtest_config(config)?;
    let defaults = BacktestSettings::default();

    Ok(BacktestSettings {
        data_path: config
            .get_string("backtest", "data_path")
            .unwrap_or(defaults.data_path),
        report_path: config
            .get_string("backtest", "report_path")
            .unwrap_or(defaults.report_path),
        warmup: config
            .get_int("backtest", "warmup", defaults.warmup as i64)
            .max(0) as usize,
        initial_capital: config.get_double("backtest", "initial_capital", defaults.initial_capital),
    })
}

fn fail(err: &StrategenError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn fail_parse(err: ParseError, source: &str) -> ExitCode {
    eprintln!("error: {}", err.display_with_context(source));
    (&StrategenError::from(err)).into()
}

fn read_file(path: &PathBuf) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("error: cannot read {}: {e}", path.display());
        (&StrategenError::from(e)).into()
    })
}

#[cfg(feature = "gemini")]
fn read_query(query: Option<String>) -> Result<String, ExitCode> {
    use std::io::{IsTerminal, Read, Write};

    let query = match query {
        Some(q) => q,
        None => {
            let mut stdin = io::stdin();
            let mut buf = String::new();
            let result = if stdin.is_terminal() {
                eprint!("Input your natural language query: ");
                let _ = io::stderr().flush();
                stdin.read_line(&mut buf).map(|_| ())
            } else {
                stdin.read_to_string(&mut buf).map(|_| ())
            };
            if let Err(e) = result {
                return Err(fail(&StrategenError::from(e)));
            }
            buf
        }
    };

    let query = query.trim().to_string();
    if query.is_empty() {
        let err = StrategenError::from(io::Error::new(
            io::ErrorKind::InvalidInput,
            "query is empty",
        ));
        return Err(fail(&err));
    }
    Ok(query)
}

fn write_program(output: Option<&PathBuf>, compiled: &CompiledStrategy) -> ExitCode {
    match output {
        Some(path) => match fs::write(path, &compiled.program) {
            Ok(()) => {
                eprintln!("Strategy saved to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: cannot write {}: {e}", path.display());
                (&StrategenError::from(e)).into()
            }
        },
        None => {
            print!("{}", compiled.program);
            ExitCode::SUCCESS
        }
    }
}

fn settings_from(config_path: Option<&PathBuf>) -> Result<(FileConfigAdapter, BacktestSettings), ExitCode> {
    let adapter = load_config(config_path)?;
    let settings = build_backtest_settings(&adapter).map_err(|e| fail(&e))?;
    Ok((adapter, settings))
}

#[cfg(feature = "gemini")]
fn run_translate(config_path: Option<&PathBuf>, query: Option<String>, output: &PathBuf) -> ExitCode {
    let (adapter, settings) = match settings_from(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let translator_settings =
        match TranslatorSettings::from_config(&adapter, std::env::var(API_KEY_ENV).ok()) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };
    let translator = match GeminiAdapter::new(translator_settings) {
        Ok(t) => t,
        Err(e) => return fail(&e.into()),
    };

    let query = match read_query(query) {
        Ok(q) => q,
        Err(code) => return code,
    };

    let result = pipeline::run_with_progress(&translator, &query, &settings, &mut |stage| {
        eprintln!("--- {}. {} ... ---", stage.number(), stage);
    });
    let compiled = match result {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    eprintln!("\nGenerated DSL:\n{}", compiled.dsl_text);
    write_program(Some(output), &compiled)
}

#[cfg(not(feature = "gemini"))]
fn run_translate(_config_path: Option<&PathBuf>, _query: Option<String>, _output: &PathBuf) -> ExitCode {
    eprintln!("error: translate needs the 'gemini' feature");
    ExitCode::from(3)
}

fn run_build(
    config_path: Option<&PathBuf>,
    json_path: &PathBuf,
    query: &str,
    output: Option<&PathBuf>,
) -> ExitCode {
    let (_, settings) = match settings_from(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let text = match read_file(json_path) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let document = match ConditionDocument::from_json_str(&text) {
        Ok(d) => d,
        Err(e) => return fail(&e.into()),
    };

    let dsl_text = bridge::json_to_dsl_text(&document);
    match pipeline::compile_dsl(&dsl_text, query, &settings) {
        Ok(compiled) => write_program(output, &compiled),
        Err(StrategenError::DslParse(e)) => fail_parse(e, &dsl_text),
        Err(e) => fail(&e),
    }
}

fn run_compile(
    config_path: Option<&PathBuf>,
    dsl_path: &PathBuf,
    query: &str,
    output: Option<&PathBuf>,
) -> ExitCode {
    let (_, settings) = match settings_from(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let text = match read_file(dsl_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    match pipeline::compile_dsl(&text, query, &settings) {
        Ok(compiled) => write_program(output, &compiled),
        Err(StrategenError::DslParse(e)) => fail_parse(e, &text),
        Err(e) => fail(&e),
    }
}

fn run_parse(dsl_path: &PathBuf, show_tree: bool) -> ExitCode {
    let text = match read_file(dsl_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    if show_tree {
        return match parser::parse(&text) {
            Ok(tree) => {
                print!("{}", tree);
                ExitCode::SUCCESS
            }
            Err(e) => fail_parse(e, &text),
        };
    }

    match pipeline::parse_dsl(&text) {
        Ok(ast) => {
            println!("{}", ast.to_json_pretty());
            ExitCode::SUCCESS
        }
        Err(e) => fail_parse(e, &text),
    }
}

fn run_to_dsl(json_path: &PathBuf) -> ExitCode {
    let text = match read_file(json_path) {
        Ok(t) => t,
        Err(code) => return code,
    };
    match ConditionDocument::from_json_str(&text) {
        Ok(document) => {
            println!("{}", bridge::json_to_dsl_text(&document));
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e.into()),
    }
}

fn run_to_json(dsl_path: &PathBuf) -> ExitCode {
    let text = match read_file(dsl_path) {
        Ok(t) => t,
        Err(code) => return code,
    };
    match bridge::dsl_to_json(&text) {
        Ok(document) => {
            println!("{}", document.to_json_pretty());
            ExitCode::SUCCESS
        }
        Err(e) => fail_parse(e, &text),
    }
}

fn run_validate(dsl_path: &PathBuf) -> ExitCode {
    eprintln!("Validating DSL: {}", dsl_path.display());
    let text = match read_file(dsl_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let ast = match pipeline::parse_dsl(&text) {
        Ok(ast) => ast,
        Err(e) => return fail_parse(e, &text),
    };

    eprintln!("  Entry rules: {}", ast.entry.len());
    eprintln!("  Exit rules:  {}", ast.exit.len());

    let indicators = referenced_indicators(&ast);
    if !indicators.is_empty() {
        eprintln!("\nIndicators referenced:");
        for indicator in &indicators {
            match indicator {
                IndicatorRef::Unrecognized(_) => {
                    eprintln!("  {} (no translation, evaluates to False)", indicator)
                }
                _ => eprintln!("  {}", indicator),
            }
        }
    }

    eprintln!("\nDSL is valid");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtest_settings_default_without_config() {
        let settings = build_backtest_settings(&FileConfigAdapter::empty()).unwrap();
        assert_eq!(settings, BacktestSettings::default());
    }

    #[test]
    fn backtest_settings_from_config() {
        let config = FileConfigAdapter::from_string(
            "[backtest]\ndata_path = prices.csv\nreport_path = trades.csv\nwarmup = 35\ninitial_capital = 500\n",
        )
        .unwrap();
        let settings = build_backtest_settings(&config).unwrap();
        assert_eq!(settings.data_path, "prices.csv");
        assert_eq!(settings.report_path, "trades.csv");
        assert_eq!(settings.warmup, 35);
        assert_eq!(settings.initial_capital, 500.0);
    }

    #[test]
    fn backtest_settings_rejects_invalid() {
        let config = FileConfigAdapter::from_string("[backtest]\nwarmup = -5\n").unwrap();
        assert!(matches!(
            build_backtest_settings(&config).unwrap_err(),
            StrategenError::ConfigInvalid { .. }
        ));
    }

    #[test]
    fn cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "strategen",
            "compile",
            "--dsl",
            "rules.dsl",
            "--verbose",
            "--config",
            "app.ini",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("app.ini")));
        assert!(matches!(cli.command, Command::Compile { output: None, .. }));
    }

    #[test]
    fn translate_output_defaults_to_simulator() {
        let cli = Cli::try_parse_from(["strategen", "translate", "--query", "buy dips"]).unwrap();
        match cli.command {
            Command::Translate { query, output } => {
                assert_eq!(query.as_deref(), Some("buy dips"));
                assert_eq!(output, PathBuf::from("simulator.py"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
