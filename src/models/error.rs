//! Error types for ankisync.
//!
//! Failures fall into four groups:
//! - external services misbehaving (network, timeout, bad status, bad body)
//! - configuration gaps (missing prompt template, unreadable config)
//! - checkpoint storage problems, which end the run
//! - internal invariant violations

use crate::models::Language;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for ankisync.
#[derive(Debug, Error)]
pub enum AnkisyncError {
    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION: the run was set up wrong
    // ═══════════════════════════════════════════════════════════════════
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("No prompt template configured for language '{0}'")]
    MissingPrompt(Language),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ═══════════════════════════════════════════════════════════════════
    // EXTERNAL: a collaborator failed; recorded per row, never fatal
    // ═══════════════════════════════════════════════════════════════════
    #[error("{service} API error (status {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid {service} response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // STORAGE: resumability can no longer be guaranteed
    // ═══════════════════════════════════════════════════════════════════
    #[error("Checkpoint storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint file {path}: {source}")]
    CorruptCheckpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // INTERNAL: should not happen
    // ═══════════════════════════════════════════════════════════════════
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnkisyncError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a checkpoint storage error with context.
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Errors that must terminate the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::CorruptCheckpoint { .. })
    }

    /// Check if another attempt could plausibly succeed.
    ///
    /// Configuration gaps are deterministic and storage errors are fatal, so
    /// neither is worth a retry.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal() && !matches!(self, Self::Config(_) | Self::MissingPrompt(_))
    }
}

/// Result type alias for ankisync.
pub type Result<T> = std::result::Result<T, AnkisyncError>;
