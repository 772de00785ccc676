//! Report retrieval pipeline
//!
//! [`ReportPipeline`] sequences one run:
//!
//! ```text
//! Idle → Authenticating → Requesting → Polling → Persisting → Delivering → Done
//!             │                │           │          │
//!             ▼                └───────────┴──────────┴──→ Failed
//!       Unauthenticated
//! ```
//!
//! Polling is entered only when the first response is `202 Accepted`. Every
//! failure up to and including persistence ends the run with one
//! [`Event::Failed`]; delivery problems never do, because the report is
//! already on disk by then.

use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::delivery::{DeliveryDispatcher, DeliveryReport, Platform};
use crate::error::{Error, IsRetryable, Result, UserMessage};
use crate::fetcher::ReportFetcher;
use crate::persist::{ArtifactPersister, CacheStore, FsCacheStore};
use crate::poller::CompletionPoller;
use crate::session::SessionProvider;
use crate::types::{Event, FetchOutcome, PersistedArtifact, PipelineState, ReportPeriod};

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Summary of a run that reached [`PipelineState::Done`]
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Period the report covers
    pub period: ReportPeriod,
    /// Saved report
    pub artifact: PersistedArtifact,
    /// How the report was presented
    pub delivery: DeliveryReport,
    /// Polling attempts made after the initial request
    pub poll_attempts: u32,
}

/// Monthly report retrieval pipeline
///
/// Runs are independent; the caller is expected to keep at most one run per
/// period in flight (e.g. by disabling the trigger while a run is active).
pub struct ReportPipeline {
    config: Config,
    session: Arc<dyn SessionProvider>,
    fetcher: ReportFetcher,
    poller: CompletionPoller,
    persister: ArtifactPersister,
    dispatcher: DeliveryDispatcher,
    event_tx: broadcast::Sender<Event>,
}

impl ReportPipeline {
    /// Build a pipeline writing to the file system and delivering through `platform`
    pub fn new(
        config: Config,
        session: Arc<dyn SessionProvider>,
        platform: Arc<dyn Platform>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let fetcher = ReportFetcher::new(&config.endpoint)?;
        let poller = CompletionPoller::new(config.poll.clone()).with_events(event_tx.clone());
        let persister = ArtifactPersister::new(Arc::new(FsCacheStore), config.storage.clone());
        let dispatcher =
            DeliveryDispatcher::for_platform(platform, &config.delivery, event_tx.clone());

        Ok(Self {
            config,
            session,
            fetcher,
            poller,
            persister,
            dispatcher,
            event_tx,
        })
    }

    /// Replace the cache store
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.persister = ArtifactPersister::new(store, self.config.storage.clone());
        self
    }

    /// Replace the delivery chain
    ///
    /// Use [`ReportPipeline::event_sender`] to give custom strategies access
    /// to the event stream.
    pub fn with_dispatcher(mut self, dispatcher: DeliveryDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Sender side of the event stream
    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.event_tx.clone()
    }

    /// Pipeline configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the report for the current month (local clock)
    pub async fn run(&self) -> Result<RunReport> {
        self.run_for(ReportPeriod::from_datetime(&Local::now())).await
    }

    /// Fetch the report for the month containing `now`
    pub async fn run_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<RunReport> {
        let period = ReportPeriod::from_datetime(now);
        self.run_for(period).await
    }

    /// Fetch the report for an explicit period
    ///
    /// On failure an [`Event::Failed`] with the user-facing message is emitted
    /// before the error is returned.
    pub async fn run_for(&self, period: ReportPeriod) -> Result<RunReport> {
        tracing::info!(period = %period, "starting report run");

        match self.execute(period).await {
            Ok(report) => {
                tracing::info!(
                    period = %period,
                    path = %report.artifact.path.display(),
                    degraded = report.delivery.is_degraded(),
                    "report run finished"
                );
                Ok(report)
            }
            Err(e) => {
                self.fail(period, &e);
                Err(e)
            }
        }
    }

    async fn execute(&self, period: ReportPeriod) -> Result<RunReport> {
        self.transition(period, PipelineState::Authenticating);
        let Some(credentials) = self.session.credentials().await? else {
            return Err(Error::Unauthenticated);
        };
        let headers = ReportFetcher::report_headers(&credentials)?;
        let url = self.config.report_url(period)?;

        self.transition(period, PipelineState::Requesting);
        let first = self.fetcher.fetch(&url, &headers).await;

        let (outcome, poll_attempts) = if first.is_pending() {
            self.transition(period, PipelineState::Polling);
            let (fetcher, url, headers) = (&self.fetcher, &url, &headers);
            let polled = self
                .poller
                .resume(first, move || fetcher.fetch(url, headers))
                .await;
            (polled.outcome, polled.attempts)
        } else {
            (first, 0)
        };

        let body = match outcome {
            FetchOutcome::Success(body) => body,
            FetchOutcome::Pending(_) => {
                return Err(Error::PollExhausted {
                    attempts: poll_attempts,
                });
            }
            FetchOutcome::Unauthorized => return Err(Error::Unauthorized),
            FetchOutcome::ServerError(status) => return Err(Error::Server { status }),
            FetchOutcome::TransportFailure(reason) => return Err(Error::Transport(reason)),
            FetchOutcome::Redirect(next) => {
                return Err(Error::Transport(format!("unfollowed redirect to {next}")));
            }
        };

        self.transition(period, PipelineState::Persisting);
        let artifact = self.persister.persist(period, &body).await?;
        self.emit(Event::ReportSaved {
            path: artifact.path.clone(),
            size: artifact.size,
        });

        self.transition(period, PipelineState::Delivering);
        let delivery = self.dispatcher.deliver(&artifact).await;
        self.emit(Event::Delivered {
            strategy: delivery.delivered_by.clone(),
            degraded: delivery.is_degraded(),
        });

        self.transition(period, PipelineState::Done);
        Ok(RunReport {
            period,
            artifact,
            delivery,
            poll_attempts,
        })
    }

    fn fail(&self, period: ReportPeriod, error: &Error) {
        let state = match error {
            Error::Unauthenticated => PipelineState::Unauthenticated,
            _ => PipelineState::Failed,
        };

        tracing::error!(
            period = %period,
            error = %error,
            code = error.error_code(),
            retryable = error.is_retryable(),
            "report run failed"
        );

        self.transition(period, state);
        self.emit(Event::Failed {
            code: error.error_code().to_string(),
            title: error.title().to_string(),
            message: error.message(),
            retryable: error.is_retryable(),
        });
    }

    fn transition(&self, period: ReportPeriod, state: PipelineState) {
        tracing::debug!(period = %period, state = %state, "pipeline state changed");
        self.emit(Event::StateChanged { period, state });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine; events are best-effort progress signals
        self.event_tx.send(event).ok();
    }
}
