//! # report-dl
//!
//! Backend library that retrieves a monthly PDF report from an authenticated
//! report service, stores it in a local cache and hands it to the user.
//!
//! ## Design Philosophy
//!
//! report-dl is designed to be:
//! - **Library-first** - No UI, the host app owns buttons and alerts
//! - **Sensible defaults** - `Config::default()` targets the production service
//! - **Event-driven** - Consumers subscribe to state changes and notices
//! - **Platform-agnostic** - Opening and sharing go through the [`delivery::Platform`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use report_dl::delivery::DesktopPlatform;
//! use report_dl::session::FileSessionProvider;
//! use report_dl::{Config, ReportPipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ReportPipeline::new(
//!         Config::default(),
//!         Arc::new(FileSessionProvider::new("session.json")),
//!         Arc::new(DesktopPlatform::from_path()),
//!     )?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = pipeline.run().await?;
//!     println!("saved to {}", report.artifact.path.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Opening, sharing and announcing saved reports
pub mod delivery;
/// Base64 encoding of binary payloads
pub mod encoding;
/// Error types
pub mod error;
/// Redirect-preserving report fetcher
pub mod fetcher;
/// Local cache writes and artifact validation
pub mod persist;
/// Report retrieval orchestrator
pub mod pipeline;
/// Completion polling with linear backoff
pub mod poller;
/// Stored session credentials
pub mod session;
/// Core types and events
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, DeliveryConfig, EndpointConfig, PollConfig, StorageConfig};
pub use delivery::{DeliveryDispatcher, DeliveryReport, DeliveryStrategy, Platform};
pub use error::{DeliveryError, Error, IsRetryable, PersistError, Result, UserMessage};
pub use fetcher::ReportFetcher;
pub use persist::{ArtifactPersister, CacheStore, FsCacheStore};
pub use pipeline::{ReportPipeline, RunReport};
pub use poller::{CompletionPoller, PollResult};
pub use session::{FileSessionProvider, SessionCredentials, SessionProvider, StaticSessionProvider};
pub use types::{Event, FetchOutcome, PersistedArtifact, PipelineState, ReportPeriod};
