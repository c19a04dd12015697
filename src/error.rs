//! Error types for vidrelay
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`] - the crate-wide error type returned by fallible operations
//! - [`AcquisitionError`] - typed failures of a single acquisition strategy
//!
//! Core pipeline errors never escape the worker pool; they are converted into
//! [`AcquisitionStatus::Failed`](crate::types::AcquisitionStatus) results or
//! logged at the component boundary that produced them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vidrelay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidrelay
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Listing a content source failed; recoverable on the next scheduled run
    #[error("source unavailable: {url}: {reason}")]
    SourceUnavailable {
        /// The source URL that could not be listed
        url: String,
        /// Why the listing failed (HTTP status, parse error, ...)
        reason: String,
    },

    /// A single acquisition strategy failed
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Writing to the dedup ledger failed
    #[error("ledger I/O error on {path}: {source}")]
    LedgerIo {
        /// The ledger store file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Delivery channel failure (login, send)
    #[error("delivery error ({channel}): {message}")]
    Delivery {
        /// Channel name (e.g., "telegram")
        channel: String,
        /// What went wrong
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Typed failure of one acquisition strategy
///
/// Tool and transport failures are handled identically by the strategy chain
/// (fall through to the next strategy) but stay distinguishable in the failure
/// reason for diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    /// External tool missing, failed to spawn, exited non-zero, timed out or
    /// produced no output
    #[error("tool invocation failed ({tool}): {reason}")]
    ToolInvocationFailed {
        /// Tool name (e.g., "yt-dlp")
        tool: String,
        /// Failure detail, including captured stderr where available
        reason: String,
    },

    /// Direct HTTP retrieval failed
    #[error("transport failed for {url}: {reason}")]
    TransportFailed {
        /// The URL being fetched
        url: String,
        /// Failure detail
        reason: String,
    },

    /// Local audio extraction failed; the media itself may still be acquired
    #[error("audio extraction failed for {media}: {reason}")]
    ExtractionFailed {
        /// The media file whose audio track could not be extracted
        media: PathBuf,
        /// Failure detail
        reason: String,
    },

    /// A strategy that does not apply to this request (e.g., audio-only
    /// when audio was not requested)
    #[error("strategy {0} skipped")]
    Skipped(&'static str),
}

impl AcquisitionError {
    /// Short machine-readable code for logs and failure reasons
    pub fn code(&self) -> &'static str {
        match self {
            AcquisitionError::ToolInvocationFailed { .. } => "tool_invocation_failed",
            AcquisitionError::TransportFailed { .. } => "transport_failed",
            AcquisitionError::ExtractionFailed { .. } => "extraction_failed",
            AcquisitionError::Skipped(_) => "skipped",
        }
    }

    /// Shorthand for a tool failure
    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        AcquisitionError::ToolInvocationFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a transport failure
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        AcquisitionError::TransportFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl Error {
    /// Short machine-readable code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::SourceUnavailable { .. } => "source_unavailable",
            Error::Acquisition(e) => e.code(),
            Error::LedgerIo { .. } => "ledger_io_failed",
            Error::Delivery { .. } => "delivery_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Yaml(_) => "yaml_error",
            Error::Other(_) => "internal_error",
        }
    }
}
