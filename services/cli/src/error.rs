//! services/cli/src/error.rs
//!
//! Defines the primary error type for the command-line service.

use crate::adapters::oauth::AuthError;
use crate::config::ConfigError;
use coursework_core::ReportError;

/// The primary error type for the `cli` service.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential loading, the interactive authorization flow, or token refresh failed.
    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    /// The listing run failed or its output could not be written.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Represents a standard Input/Output error (e.g., opening the trace file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
