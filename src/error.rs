//! Error types for report-dl
//!
//! This module provides the error taxonomy of the report pipeline:
//! - [`Error`] for everything that aborts a run before the report is delivered
//! - [`PersistError`] for cache writes and artifact validation
//! - [`DeliveryError`] for platform open/share actions (never fatal to a run)
//! - [`UserMessage`] to turn an error into the single alert shown to the user

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for report-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for report-dl
///
/// Every variant is a terminal state of a pipeline run. Delivery problems are
/// deliberately absent: once the artifact is on disk the run completes, see
/// [`crate::delivery::DeliveryReport::is_degraded`].
#[derive(Debug, Error)]
pub enum Error {
    /// No stored session; the user has to sign in first
    #[error("no stored session: sign in required")]
    Unauthenticated,

    /// The stored session cannot be turned into request headers
    #[error("stored session is unusable: {0}")]
    InvalidSession(String),

    /// The server rejected the session credentials (HTTP 401)
    #[error("server rejected the session credentials (401)")]
    Unauthorized,

    /// Network failure or broken redirect chain
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-2xx response other than 202 and 401
    #[error("server returned status {status}")]
    Server {
        /// HTTP status code returned by the report endpoint
        status: u16,
    },

    /// The report job never completed within the polling budget
    #[error("report still pending after {attempts} poll attempts")]
    PollExhausted {
        /// Number of polling attempts made after the initial request
        attempts: u32,
    },

    /// Writing or validating the local artifact failed
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),

    /// Year/month pair does not name a calendar month
    #[error("invalid report period {year}-{month}")]
    InvalidPeriod {
        /// Requested year
        year: i32,
        /// Requested month (expected 1-12)
        month: u32,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "endpoint.base_url")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (stored session data)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Errors raised while writing the report to the local cache
#[derive(Debug, Error)]
pub enum PersistError {
    /// The stored file is missing, smaller than the minimum size, or truncated
    #[error("artifact {path} is empty or corrupt: {size} bytes (minimum {min})")]
    EmptyOrCorrupt {
        /// Path of the rejected artifact
        path: PathBuf,
        /// Size found on disk (0 when the file does not exist)
        size: u64,
        /// Minimum accepted size
        min: u64,
    },

    /// File system operation failed
    #[error("failed to {operation} {path}: {source}")]
    Io {
        /// What was being done ("write", "stat", "rename", ...)
        operation: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encoded text handed to the cache store is not valid base64
    #[error("encoded artifact is not valid base64: {0}")]
    Decode(String),
}

/// Errors raised by a single delivery strategy
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The platform does not offer this action
    #[error("{action} is not available on this platform")]
    Unavailable {
        /// The unavailable action (e.g., "share")
        action: &'static str,
    },

    /// The platform action was invoked and failed
    #[error("{action} failed: {reason}")]
    ActionFailed {
        /// The action that failed (e.g., "view", "open_url")
        action: &'static str,
        /// Why it failed
        reason: String,
    },
}

/// Trait for errors that can be classified as transient or permanent
///
/// The pipeline never retries on its own beyond the completion poller; this
/// classification only tells the host whether offering "try again" makes sense.
pub trait IsRetryable {
    /// Returns true if running the pipeline again may succeed without user action
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Broken connections and slow report jobs usually clear up
            Error::Transport(_) | Error::PollExhausted { .. } => true,
            Error::Server { status } => *status >= 500,
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
            ),
            // A truncated body is worth another download
            Error::Persist(PersistError::EmptyOrCorrupt { .. }) => true,
            Error::Persist(_) => false,
            // Session problems need the user to sign in again
            Error::Unauthenticated | Error::InvalidSession(_) | Error::Unauthorized => false,
            Error::InvalidPeriod { .. } | Error::Config { .. } => false,
            Error::Serialization(_) => false,
        }
    }
}

/// Convert errors to the alert shown to the user
///
/// Every failed run surfaces exactly one of these, so the wording is written
/// for end users rather than for logs.
pub trait UserMessage {
    /// Short alert title
    fn title(&self) -> &str;

    /// Alert body
    fn message(&self) -> String;

    /// Machine-readable error code
    fn error_code(&self) -> &str;
}

impl UserMessage for Error {
    fn title(&self) -> &str {
        match self {
            Error::Unauthenticated | Error::InvalidSession(_) => "Sign in required",
            Error::Unauthorized => "Not authorized",
            Error::Transport(_) | Error::Network(_) => "Connection problem",
            Error::Server { .. } => "Report could not be generated",
            Error::PollExhausted { .. } => "Report not ready yet",
            Error::Persist(PersistError::EmptyOrCorrupt { .. }) => "Empty report",
            Error::Persist(_) | Error::Io(_) => "Report could not be saved",
            Error::InvalidPeriod { .. } | Error::Config { .. } | Error::Serialization(_) => {
                "Report unavailable"
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Error::Unauthenticated => "Sign in to generate and download the report.".to_string(),
            Error::InvalidSession(_) => {
                "Your session could not be read. Sign in again to download the report."
                    .to_string()
            }
            Error::Unauthorized => "The server did not accept the request (401).".to_string(),
            Error::Transport(_) | Error::Network(_) => {
                "The report service could not be reached. Check your connection and try again."
                    .to_string()
            }
            Error::Server { status } => format!("Code {status}."),
            Error::PollExhausted { .. } => {
                "The report is still being generated. Try again in a few minutes.".to_string()
            }
            Error::Persist(PersistError::EmptyOrCorrupt { .. }) => {
                "The downloaded file appears to be empty. Try again.".to_string()
            }
            Error::Persist(_) | Error::Io(_) => {
                "The report was downloaded but could not be stored on this device.".to_string()
            }
            Error::InvalidPeriod { .. } | Error::Config { .. } | Error::Serialization(_) => {
                format!("The report cannot be requested: {self}.")
            }
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::InvalidSession(_) => "invalid_session",
            Error::Unauthorized => "unauthorized",
            Error::Transport(_) => "transport_failure",
            Error::Server { .. } => "server_error",
            Error::PollExhausted { .. } => "poll_exhausted",
            Error::Persist(PersistError::EmptyOrCorrupt { .. }) => "empty_or_corrupt",
            Error::Persist(_) => "persist_failed",
            Error::InvalidPeriod { .. } => "invalid_period",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Network(_) => "network_error",
        }
    }
}
