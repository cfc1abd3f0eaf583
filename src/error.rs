//! Error types for the qbank-convert library.
//!
//! Every failure is terminal for the request that hit it: nothing in the
//! library retries. [`ConvertError::status_class`] splits the taxonomy into
//! client-caused failures (bad form fields, bad selector) and server-side ones
//! (missing runtime, converter misbehaviour, filesystem trouble) so the HTTP
//! layer can pick a status code without matching on every variant.
//!
//! Messages are what the uploader sees. Diagnostic detail that is too noisy
//! for a user (full converter stdout/stderr) is kept in fields and written to
//! the server log instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::request::Category;

/// Which side of the request caused the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Missing or invalid request data. Maps to HTTP 400.
    Client,
    /// Environment, converter, or filesystem failure. Maps to HTTP 500.
    Server,
}

/// The (category, subtype) pair does not name a converter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// `category` is neither `Mock` nor `Section`.
    #[error("Invalid category")]
    UnknownCategory { category: String },

    /// `category` is valid but `subtype` is not one of its subtypes.
    #[error("Invalid question type for {category}")]
    UnknownSubtype { category: Category, subtype: String },
}

/// All fatal errors returned by the qbank-convert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required form field is missing or unusable.
    #[error("{0}")]
    Validation(String),

    /// The category/subtype selector does not resolve to a converter.
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),

    // ── Environment errors ────────────────────────────────────────────────
    /// No interpreter candidate answered the version probe.
    #[error("Python required: {hint}")]
    RuntimeNotFound { tried: Vec<String>, hint: String },

    /// The upload could not be written to the staging directory.
    #[error("Failed to stage upload at '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Converter errors ──────────────────────────────────────────────────
    /// The converter could not be run, exited nonzero, or reported an
    /// archive that does not exist.
    #[error("{message}")]
    ConversionFailed {
        message: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Converter stdout did not name an archive.
    ///
    /// `stdout`/`stderr` are the full captured streams.
    #[error("Processing failed to generate output file")]
    OutputProtocolViolation {
        candidate: Option<String>,
        stdout: String,
        stderr: String,
    },

    /// The archive vanished or became unreadable before it could be sent.
    #[error("Failed to read output archive '{path}': {source}")]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The one-shot CLI could not write the archive to its destination.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Internal errors ───────────────────────────────────────────────────
    /// The detached conversion task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Nonzero exit: the message carries stderr, or a generic fallback.
    pub fn process_failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        let detail = if stderr.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            stderr.trim().to_string()
        };
        Self::ConversionFailed {
            message: format!("Processing failed: {detail}"),
            exit_code,
            stderr,
        }
    }

    /// The converter reported a path that does not exist on disk.
    pub fn output_missing(stderr: impl Into<String>) -> Self {
        Self::ConversionFailed {
            message: "Processing failed to create output file".to_string(),
            exit_code: Some(0),
            stderr: stderr.into(),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            Self::Validation(_) | Self::InvalidSelector(_) => StatusClass::Client,
            Self::RuntimeNotFound { .. }
            | Self::StagingFailed { .. }
            | Self::ConversionFailed { .. }
            | Self::OutputProtocolViolation { .. }
            | Self::ArtifactUnreadable { .. }
            | Self::OutputWriteFailed { .. }
            | Self::InvalidConfig(_)
            | Self::Internal(_) => StatusClass::Server,
        }
    }
}

impl From<runtime_locate::LocateError> for ConvertError {
    fn from(e: runtime_locate::LocateError) -> Self {
        match e {
            runtime_locate::LocateError::NotFound { tried, hint } => {
                Self::RuntimeNotFound { tried, hint }
            }
        }
    }
}
