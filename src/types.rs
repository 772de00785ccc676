//! Core types for report-dl

use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::encoding;
use crate::error::{Error, Result};

/// Calendar month a report covers
///
/// Built once per run from the invocation time and never changed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
}

impl ReportPeriod {
    /// Create a period, rejecting months outside 1-12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// Period containing the given instant, in that instant's own time zone
    pub fn from_datetime<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12)
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Endpoint path segment, `{year}/{month:02}`
    pub fn url_path(&self) -> String {
        format!("{}/{:02}", self.year, self.month)
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Result of one logical fetch against the report endpoint
///
/// Each request produces a fresh value; outcomes are never updated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx with the report body
    Success(Vec<u8>),
    /// Redirect to an already resolved location (single-hop fetches only)
    Redirect(Url),
    /// 202: the report job is still running; carries the `Retry-After` hint if sent
    Pending(Option<Duration>),
    /// 401: credentials rejected
    Unauthorized,
    /// Any other non-2xx status
    ServerError(u16),
    /// Network failure or broken redirect chain
    TransportFailure(String),
}

impl FetchOutcome {
    /// Whether the server is still generating the report
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchOutcome::Pending(_))
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Success(_) => "success",
            FetchOutcome::Redirect(_) => "redirect",
            FetchOutcome::Pending(_) => "pending",
            FetchOutcome::Unauthorized => "unauthorized",
            FetchOutcome::ServerError(_) => "server_error",
            FetchOutcome::TransportFailure(_) => "transport_failure",
        }
    }
}

/// Base64 text of a report body, with the length of the bytes it encodes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedArtifact {
    /// Encoded text
    pub text: String,
    /// Length of the original byte buffer
    pub byte_len: usize,
}

impl EncodedArtifact {
    /// Encode a raw body
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            text: encoding::encode(bytes),
            byte_len: bytes.len(),
        }
    }
}

/// Report file stored in the local cache
///
/// Created once per successful run and never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedArtifact {
    /// Location on disk
    pub path: PathBuf,
    /// Whether the file existed when it was checked
    pub exists: bool,
    /// Size in bytes when it was checked
    pub size: u64,
}

impl PersistedArtifact {
    /// `file://` URI for the artifact, resolved against the current directory if relative
    pub fn uri(&self) -> String {
        std::path::absolute(&self.path)
            .ok()
            .and_then(|abs| Url::from_file_path(abs).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| format!("file://{}", self.path.display()))
    }
}

/// State of a pipeline run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started
    Idle,
    /// Reading the stored session
    Authenticating,
    /// First request to the report endpoint
    Requesting,
    /// Waiting for the report job to finish
    Polling,
    /// Writing and validating the local file
    Persisting,
    /// Handing the file to the platform
    Delivering,
    /// Report saved and delivery attempted
    Done,
    /// No stored session
    Unauthenticated,
    /// Run aborted with a user-visible error
    Failed,
}

impl PipelineState {
    /// Whether no further transitions follow
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Unauthenticated | PipelineState::Failed
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Authenticating => "authenticating",
            PipelineState::Requesting => "requesting",
            PipelineState::Polling => "polling",
            PipelineState::Persisting => "persisting",
            PipelineState::Delivering => "delivering",
            PipelineState::Done => "done",
            PipelineState::Unauthenticated => "unauthenticated",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Event emitted during a pipeline run
///
/// Hosts subscribe to these to drive progress indicators and alerts.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The run moved to a new state
    StateChanged {
        /// Report period of the run
        period: ReportPeriod,
        /// New state
        state: PipelineState,
    },

    /// The report job was still running; waiting before the next attempt
    PollAttempt {
        /// Attempt number (1-based)
        attempt: u32,
        /// Attempt budget
        max_attempts: u32,
        /// Wait before this attempt in milliseconds
        delay_ms: u64,
    },

    /// The report was written to the cache and validated
    ReportSaved {
        /// Location on disk
        path: PathBuf,
        /// Size in bytes
        size: u64,
    },

    /// Delivery finished
    Delivered {
        /// Strategy that succeeded, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        strategy: Option<String>,
        /// True when the report could not be opened or shared
        degraded: bool,
    },

    /// Informational notice for the user
    Notice {
        /// Alert title
        title: String,
        /// Alert body
        message: String,
    },

    /// The run failed; exactly one is emitted per failed run
    Failed {
        /// Machine-readable error code
        code: String,
        /// Alert title
        title: String,
        /// Alert body
        message: String,
        /// Whether running again may help
        retryable: bool,
    },
}
