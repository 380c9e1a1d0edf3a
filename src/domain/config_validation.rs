//! Configuration validation.
//!
//! Checks the `[translator]` and `[backtest]` sections before any value is
//! used. Absent keys fall back to their defaults and are always valid.

use crate::domain::codegen::BacktestSettings;
use crate::domain::error::StrategenError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: i64 = 60;

pub fn validate_translator_config(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    validate_model(config)?;
    validate_endpoint(config)?;
    validate_timeout(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    validate_path(config, "data_path")?;
    validate_path(config, "report_path")?;
    validate_warmup(config)?;
    validate_initial_capital(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> StrategenError {
    StrategenError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    match config.get_string("translator", "model") {
        Some(s) if s.trim().is_empty() => {
            Err(invalid("translator", "model", "model must not be empty"))
        }
        _ => Ok(()),
    }
}

fn validate_endpoint(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    let endpoint = config
        .get_string("translator", "endpoint")
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(invalid(
            "translator",
            "endpoint",
            "endpoint must start with http:// or https://",
        ));
    }
    Ok(())
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    let value = config.get_int("translator", "timeout_secs", DEFAULT_TIMEOUT_SECS);
    if value <= 0 {
        return Err(invalid(
            "translator",
            "timeout_secs",
            "timeout_secs must be positive",
        ));
    }
    Ok(())
}

fn validate_path(config: &dyn ConfigPort, key: &str) -> Result<(), StrategenError> {
    match config.get_string("backtest", key) {
        Some(s) if s.trim().is_empty() => Err(invalid(
            "backtest",
            key,
            &format!("{} must not be empty", key),
        )),
        _ => Ok(()),
    }
}

fn validate_warmup(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    let default = BacktestSettings::default().warmup as i64;
    let value = config.get_int("backtest", "warmup", default);
    if value < 0 {
        return Err(invalid("backtest", "warmup", "warmup must be non-negative"));
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), StrategenError> {
    let default = BacktestSettings::default().initial_capital;
    let value = config.get_double("backtest", "initial_capital", default);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}
