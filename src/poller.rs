//! Completion polling for asynchronously generated reports
//!
//! The report endpoint answers `202 Accepted` while the report job is still
//! running. [`CompletionPoller`] re-issues the fetch with a linear backoff
//! (`base_delay × attempt`) until the server answers with anything else or the
//! attempt budget runs out.
//!
//! # Example
//!
//! ```no_run
//! use report_dl::config::PollConfig;
//! use report_dl::poller::CompletionPoller;
//! use report_dl::types::FetchOutcome;
//!
//! # async fn example() {
//! let poller = CompletionPoller::new(PollConfig::default());
//! let result = poller.poll(|| async {
//!     // Your fetch here
//!     FetchOutcome::Pending(None)
//! }).await;
//! if result.is_exhausted() {
//!     // report the job as not ready
//! }
//! # }
//! ```

use std::future::Future;
use tokio::sync::broadcast;

use crate::config::PollConfig;
use crate::types::{Event, FetchOutcome};

/// Final outcome of a polling loop
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollResult {
    /// First non-pending outcome, or the last pending one when the budget ran out
    pub outcome: FetchOutcome,
    /// Number of polling attempts made after the initial fetch
    pub attempts: u32,
}

impl PollResult {
    /// The job was still pending after every attempt
    pub fn is_exhausted(&self) -> bool {
        self.outcome.is_pending()
    }
}

/// Bounded linear-backoff loop over a fetch operation
#[derive(Clone, Debug)]
pub struct CompletionPoller {
    config: PollConfig,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl CompletionPoller {
    /// Create a poller with the given budget and delay
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            event_tx: None,
        }
    }

    /// Emit [`Event::PollAttempt`] before every wait
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Polling settings
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Fetch once, then keep polling while the outcome is pending
    pub async fn poll<F, Fut>(&self, mut fetch: F) -> PollResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let first = fetch().await;
        self.resume(first, fetch).await
    }

    /// Continue from an outcome the caller already has
    ///
    /// Returns immediately if `outcome` is not pending. Otherwise waits
    /// `base_delay × n` before attempt `n` (1..=max_attempts). Any non-pending
    /// outcome ends the loop, server errors included; nothing but 202 is
    /// retried here.
    pub async fn resume<F, Fut>(&self, mut outcome: FetchOutcome, mut fetch: F) -> PollResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetchOutcome>,
    {
        let mut attempt = 0;

        while outcome.is_pending() && attempt < self.config.max_attempts {
            attempt += 1;
            let delay = self.config.delay_for(attempt);

            tracing::debug!(
                attempt = attempt,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis(),
                "report job still running, waiting before next attempt"
            );

            if let Some(tx) = &self.event_tx {
                tx.send(Event::PollAttempt {
                    attempt,
                    max_attempts: self.config.max_attempts,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                })
                .ok();
            }

            // Cooperative wait: other tasks keep running while the job finishes
            tokio::time::sleep(delay).await;
            outcome = fetch().await;
        }

        if outcome.is_pending() {
            tracing::warn!(
                attempts = attempt,
                "report job still pending after polling budget exhausted"
            );
        } else if attempt > 0 {
            tracing::info!(
                attempts = attempt,
                outcome = outcome.label(),
                "report job finished polling"
            );
        }

        PollResult {
            outcome,
            attempts: attempt,
        }
    }
}
