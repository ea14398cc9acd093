//! Error types for template loading, prompt assembly and model transport.
//!
//! Parse degradation is not an error: it is reported through
//! `Judgment::parse_succeeded`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the evaluation engine.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The caller broke the request contract (missing text, no template, ...).
    /// Raised before any model call.
    #[error("invalid request: {0}")]
    CallerContract(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("invalid template '{id}': {reason}")]
    InvalidTemplate { id: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl JudgeError {
    pub(crate) fn contract(msg: impl Into<String>) -> Self {
        JudgeError::CallerContract(msg.into())
    }

    pub(crate) fn invalid_template(id: &str, reason: impl Into<String>) -> Self {
        JudgeError::InvalidTemplate {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures talking to the judge model. Owned by the transport; the engine
/// only propagates them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("judge command is empty")]
    EmptyCommand,

    #[error("failed to run judge command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to encode judge request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("judge command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("judge worker thread disconnected")]
    Disconnected,
}

/// Errors loading a template catalogue from disk or from embedded data.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("failed to read template catalogue {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template catalogue {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_norway::Error,
    },

    #[error("template catalogue {origin}: {source}")]
    Invalid {
        origin: String,
        #[source]
        source: JudgeError,
    },
}
