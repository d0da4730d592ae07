//! Crate-level errors for startup and wiring

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("LLM client error: {0}")]
    Llm(#[from] crate::chat::LlmError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
