//! Error types for the veriflow harness.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering configuration, halt signaling, collaborator failures, and
//! report output.

use std::path::PathBuf;

use crate::metrics::StageResult;
use crate::stage::Stage;

/// Top-level error type for the veriflow core library.
#[derive(Debug, thiserror::Error)]
pub enum VeriflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The halt policy stopped the run after a stage failed validation.
    /// Carries the triggering result so callers can inspect the alerts
    /// without re-running.
    #[error("Run halted: {stage} stage failed validation")]
    Halted {
        stage: Stage,
        result: Box<StageResult>,
    },

    /// A stage function, hook, or collaborator returned an error.
    #[error("Collaborator failure in {stage} stage: {source}")]
    Collaborator {
        stage: Stage,
        source: anyhow::Error,
    },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Logging setup error: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VeriflowError {
    /// Whether this error is the halt signal rather than a real failure.
    pub fn is_halt(&self) -> bool {
        matches!(self, VeriflowError::Halted { .. })
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Unknown stage '{name}' (expected one of: pre_extract, extract, \
         pre_transform, transform, pre_load, load)"
    )]
    UnknownStage { name: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from report rendering and output.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Template render failed: {message}")]
    Render { message: String },

    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A type alias for results using the top-level `VeriflowError`.
pub type Result<T> = std::result::Result<T, VeriflowError>;
