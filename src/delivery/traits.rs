//! Traits and types for handing a saved report to the user

use async_trait::async_trait;
use std::path::Path;

use crate::error::DeliveryError;
use crate::types::PersistedArtifact;

/// Intent flag granting the receiving app read access to a content URI
pub const FLAG_GRANT_READ_URI_PERMISSION: u32 = 0x0000_0001;

/// Actions a host platform offers for opening files
///
/// Used to pick delivery strategies by what the platform can do rather than
/// by which platform it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Can expose files through content URIs and dispatch a "view" action
    pub content_view: bool,
    /// Can open a `file://` URL with the default handler
    pub open_url: bool,
    /// May offer a share/export sheet (checked again at delivery time)
    pub share: bool,
}

/// Request to view a document through the platform's view action
#[derive(Debug, Clone, Copy)]
pub struct ViewRequest<'a> {
    /// Content URI of the document
    pub uri: &'a str,
    /// MIME type of the document
    pub mime_type: &'a str,
    /// Intent flags (e.g. [`FLAG_GRANT_READ_URI_PERMISSION`])
    pub flags: u32,
}

/// Options for the share/export sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOptions {
    /// MIME type of the shared file
    pub mime_type: String,
    /// Uniform type identifier of the shared file
    pub uti: String,
    /// Sheet title
    pub dialog_title: String,
}

/// Host platform actions used by the delivery strategies
///
/// Every action has a default that reports it as unavailable, so an
/// implementation only overrides what its platform supports.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Static capabilities of this platform
    fn capabilities(&self) -> PlatformCapabilities;

    /// Resolve a content URI other apps can read for a local file
    async fn content_uri(&self, _path: &Path) -> Result<String, DeliveryError> {
        Err(DeliveryError::Unavailable {
            action: "content_uri",
        })
    }

    /// Dispatch the platform's "view" action
    async fn view(&self, _request: ViewRequest<'_>) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable { action: "view" })
    }

    /// Open a URL with its default handler
    async fn open_url(&self, _url: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable { action: "open_url" })
    }

    /// Whether a share sheet can be shown right now
    async fn share_available(&self) -> bool {
        false
    }

    /// Show the share sheet for a local file
    async fn share(&self, _path: &Path, _options: &ShareOptions) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable { action: "share" })
    }

    /// Get the name of this platform implementation
    fn name(&self) -> &'static str;
}

/// One way of presenting a saved report
#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    /// Strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Whether the strategy can run right now
    async fn is_available(&self) -> bool;

    /// Present the report
    async fn deliver(&self, artifact: &PersistedArtifact) -> Result<(), DeliveryError>;

    /// Whether success means the user actually got the document (opened or shared)
    ///
    /// Purely informational strategies return false, and a delivery that only
    /// succeeds through them counts as degraded.
    fn presents_artifact(&self) -> bool {
        true
    }
}
