//! Port traits implemented by adapters.

pub mod config_port;
pub mod translator_port;
