//! Error types for comparekit.
//!
//! Library crates use [`ComparekitError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all comparekit operations.
#[derive(Debug, thiserror::Error)]
pub enum ComparekitError {
    /// The raw catalog table does not exist.
    #[error("source table not found at {path:?}")]
    SourceUnavailable { path: PathBuf },

    /// The raw catalog table exists but cannot be parsed.
    #[error("source table {path:?} is malformed: {message}")]
    SourceMalformed { path: PathBuf, message: String },

    /// The generation service credential is not set.
    #[error("credential missing: set the {var} environment variable")]
    CredentialMissing { var: String },

    /// Requesting or parsing generated content for one entry failed.
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    /// The enriched table on disk could not be read back.
    #[error("enriched store at {path:?} is corrupt: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    /// Network/HTTP error talking to the generation service.
    #[error("network error: {0}")]
    Network(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV encoding error while writing a table.
    #[error("csv error at {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ComparekitError>;

impl ComparekitError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a synthesis failure from any displayable message.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::SynthesisFailed(msg.into())
    }

    /// Create a malformed-source error for `path`.
    pub fn source_malformed(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceMalformed {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a corrupt-store error for `path`.
    pub fn store_corrupt(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a `csv::Error` with a path for context.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects a single catalog entry.
    pub fn is_per_entry(&self) -> bool {
        matches!(self, Self::SynthesisFailed(_))
    }
}
