//! CLI error types.

use scrivo_config::ConfigError;
use scrivo_site::SourceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid include pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0}")]
    Validation(String),
}
