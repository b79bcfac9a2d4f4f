//! Error types for the CLI application.

use mrclean_domain::RuleError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A retention rule is invalid
    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),

    /// Sweep engine error
    #[error("Engine error: {0}")]
    Engine(#[from] mrclean_engine::EngineError),
}
