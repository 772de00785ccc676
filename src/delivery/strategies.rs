//! Concrete delivery strategies

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::traits::{
    DeliveryStrategy, FLAG_GRANT_READ_URI_PERMISSION, Platform, ShareOptions, ViewRequest,
};
use crate::error::DeliveryError;
use crate::types::{Event, PersistedArtifact};

/// Resolve a content URI and dispatch the platform "view" action with a read grant
pub struct ViewIntent {
    platform: Arc<dyn Platform>,
    mime_type: String,
}

impl ViewIntent {
    /// Create the strategy for the given document MIME type
    pub fn new(platform: Arc<dyn Platform>, mime_type: impl Into<String>) -> Self {
        Self {
            platform,
            mime_type: mime_type.into(),
        }
    }
}

#[async_trait]
impl DeliveryStrategy for ViewIntent {
    fn name(&self) -> &'static str {
        "view_intent"
    }

    async fn is_available(&self) -> bool {
        self.platform.capabilities().content_view
    }

    async fn deliver(&self, artifact: &PersistedArtifact) -> Result<(), DeliveryError> {
        let uri = self.platform.content_uri(&artifact.path).await?;
        self.platform
            .view(ViewRequest {
                uri: &uri,
                mime_type: &self.mime_type,
                flags: FLAG_GRANT_READ_URI_PERMISSION,
            })
            .await
    }
}

/// Open the artifact's `file://` URI with the default handler
pub struct OpenUrl {
    platform: Arc<dyn Platform>,
}

impl OpenUrl {
    /// Create the strategy
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl DeliveryStrategy for OpenUrl {
    fn name(&self) -> &'static str {
        "open_url"
    }

    async fn is_available(&self) -> bool {
        self.platform.capabilities().open_url
    }

    async fn deliver(&self, artifact: &PersistedArtifact) -> Result<(), DeliveryError> {
        self.platform.open_url(&artifact.uri()).await
    }
}

/// Offer the artifact through the share/export sheet
pub struct Share {
    platform: Arc<dyn Platform>,
    options: ShareOptions,
}

impl Share {
    /// Create the strategy with the given sheet options
    pub fn new(platform: Arc<dyn Platform>, options: ShareOptions) -> Self {
        Self { platform, options }
    }
}

#[async_trait]
impl DeliveryStrategy for Share {
    fn name(&self) -> &'static str {
        "share"
    }

    async fn is_available(&self) -> bool {
        self.platform.capabilities().share && self.platform.share_available().await
    }

    async fn deliver(&self, artifact: &PersistedArtifact) -> Result<(), DeliveryError> {
        self.platform.share(&artifact.path, &self.options).await
    }
}

/// Tell the user where the report was saved
///
/// Always available. Fails only when nobody is subscribed to the event
/// stream, since then the notice would reach no one.
pub struct Notify {
    event_tx: broadcast::Sender<Event>,
}

impl Notify {
    /// Title of the notice
    pub const TITLE: &'static str = "Report downloaded";

    /// Create the strategy publishing on the given event channel
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self { event_tx }
    }
}

#[async_trait]
impl DeliveryStrategy for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn deliver(&self, artifact: &PersistedArtifact) -> Result<(), DeliveryError> {
        let message = format!("Saved to: {}", artifact.uri());
        tracing::info!(path = %artifact.path.display(), "report location sent to user");

        self.event_tx
            .send(Event::Notice {
                title: Self::TITLE.to_string(),
                message,
            })
            .map(|_| ())
            .map_err(|_| DeliveryError::ActionFailed {
                action: "notify",
                reason: "no event subscribers".to_string(),
            })
    }

    fn presents_artifact(&self) -> bool {
        false
    }
}
