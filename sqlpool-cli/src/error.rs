//! CLI error types and result alias.

use miette::Diagnostic;
use sqlpool_core::PoolError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(sqlpool::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(sqlpool::config), help("pass --url, set DATABASE_URL, or add [database] url to sqlpool.toml"))]
    Config(String),

    /// Pool or database error
    #[error("Database error: {0}")]
    #[diagnostic(code(sqlpool::database))]
    Pool(#[from] PoolError),

    /// A benchmark task failed to complete
    #[error("Benchmark error: {0}")]
    #[diagnostic(code(sqlpool::bench))]
    Bench(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}
