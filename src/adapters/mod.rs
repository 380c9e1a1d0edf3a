//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
#[cfg(feature = "gemini")]
pub mod gemini_adapter;
