//! Delivery of saved reports to the user
//!
//! ## Architecture
//!
//! Delivery is an ordered list of [`DeliveryStrategy`] values tried in turn
//! until one succeeds. [`DeliveryDispatcher::for_platform`] builds the list
//! from the platform's [`PlatformCapabilities`]:
//!
//! 1. [`ViewIntent`] when the platform has content URIs, otherwise [`OpenUrl`]
//! 2. [`Share`] when the platform has a share sheet
//! 3. [`Notify`], which tells the user where the file was saved
//!
//! A failing strategy never aborts the run; the report is already on disk.
//!
//! ## Usage
//!
//! ```no_run
//! use report_dl::config::DeliveryConfig;
//! use report_dl::delivery::{DeliveryDispatcher, DesktopPlatform};
//! use report_dl::types::PersistedArtifact;
//! use std::sync::Arc;
//! use tokio::sync::broadcast;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (events, _rx) = broadcast::channel(16);
//! let dispatcher = DeliveryDispatcher::for_platform(
//!     Arc::new(DesktopPlatform::from_path()),
//!     &DeliveryConfig::default(),
//!     events,
//! );
//! # let artifact = PersistedArtifact { path: "informe-2025-01.pdf".into(), exists: true, size: 2000 };
//! let report = dispatcher.deliver(&artifact).await;
//! if report.is_degraded() {
//!     // saved, but neither opened nor shared
//! }
//! # }
//! ```

mod desktop;
mod strategies;
mod traits;

pub use desktop::DesktopPlatform;
pub use strategies::{Notify, OpenUrl, Share, ViewIntent};
pub use traits::{
    DeliveryStrategy, FLAG_GRANT_READ_URI_PERMISSION, Platform, PlatformCapabilities,
    ShareOptions, ViewRequest,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::DeliveryConfig;
use crate::types::{Event, PersistedArtifact};

/// A strategy that was skipped or failed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
    /// Strategy name
    pub strategy: String,
    /// Why it did not deliver
    pub reason: String,
}

/// Result of a delivery attempt
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Strategy that succeeded, if any
    pub delivered_by: Option<String>,
    /// Whether that strategy put the document in front of the user
    pub presented: bool,
    /// Strategies tried before, in order
    pub failures: Vec<StrategyFailure>,
}

impl DeliveryReport {
    /// The report is saved but could not be opened or shared
    pub fn is_degraded(&self) -> bool {
        !self.presented
    }
}

/// Ordered fallback chain of delivery strategies
pub struct DeliveryDispatcher {
    strategies: Vec<Box<dyn DeliveryStrategy>>,
}

impl DeliveryDispatcher {
    /// Dispatcher over an explicit strategy list, tried front to back
    pub fn new(strategies: Vec<Box<dyn DeliveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// Standard chain for a platform: primary open, share, notify
    pub fn for_platform(
        platform: Arc<dyn Platform>,
        config: &DeliveryConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        let caps = platform.capabilities();
        let mut strategies: Vec<Box<dyn DeliveryStrategy>> = Vec::new();

        if caps.content_view {
            strategies.push(Box::new(ViewIntent::new(
                platform.clone(),
                config.mime_type.clone(),
            )));
        } else if caps.open_url {
            strategies.push(Box::new(OpenUrl::new(platform.clone())));
        }

        if caps.share {
            strategies.push(Box::new(Share::new(
                platform.clone(),
                ShareOptions {
                    mime_type: config.mime_type.clone(),
                    uti: config.uti.clone(),
                    dialog_title: config.dialog_title.clone(),
                },
            )));
        }

        strategies.push(Box::new(Notify::new(event_tx)));

        tracing::debug!(
            platform = platform.name(),
            strategies = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "delivery chain configured"
        );

        Self::new(strategies)
    }

    /// Names of the configured strategies, in order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy until one succeeds
    ///
    /// Never fails: when every strategy fails the returned report is degraded
    /// and lists why.
    pub async fn deliver(&self, artifact: &PersistedArtifact) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for strategy in &self.strategies {
            let name = strategy.name();

            if !strategy.is_available().await {
                tracing::debug!(strategy = name, "delivery strategy unavailable, skipping");
                report.failures.push(StrategyFailure {
                    strategy: name.to_string(),
                    reason: "unavailable".to_string(),
                });
                continue;
            }

            match strategy.deliver(artifact).await {
                Ok(()) => {
                    tracing::info!(
                        strategy = name,
                        path = %artifact.path.display(),
                        "report delivered"
                    );
                    report.delivered_by = Some(name.to_string());
                    report.presented = strategy.presents_artifact();
                    return report;
                }
                Err(e) => {
                    tracing::warn!(strategy = name, error = %e, "delivery strategy failed, falling back");
                    report.failures.push(StrategyFailure {
                        strategy: name.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::warn!(
            path = %artifact.path.display(),
            attempts = report.failures.len(),
            "every delivery strategy failed"
        );
        report
    }
}
