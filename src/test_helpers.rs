//! Shared test doubles for unit tests

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::delivery::{Platform, PlatformCapabilities, ShareOptions, ViewRequest};
use crate::encoding;
use crate::error::{DeliveryError, PersistError};
use crate::persist::{CacheStore, FileInfo};

/// Platform action observed by [`RecordingPlatform`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlatformCall {
    ContentUri(PathBuf),
    View {
        uri: String,
        mime_type: String,
        flags: u32,
    },
    OpenUrl(String),
    Share {
        path: PathBuf,
        mime_type: String,
        uti: String,
        dialog_title: String,
    },
}

/// Scriptable platform that records every action it is asked to perform
pub(crate) struct RecordingPlatform {
    caps: PlatformCapabilities,
    open_fails: bool,
    share_available: bool,
    share_fails: bool,
    calls: Mutex<Vec<PlatformCall>>,
}

impl RecordingPlatform {
    fn with_caps(caps: PlatformCapabilities) -> Self {
        Self {
            caps,
            open_fails: false,
            share_available: caps.share,
            share_fails: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Content URIs + view action + share sheet
    pub(crate) fn mobile_with_content_uris() -> Self {
        Self::with_caps(PlatformCapabilities {
            content_view: true,
            open_url: true,
            share: true,
        })
    }

    /// URL open + share sheet
    pub(crate) fn mobile_with_url_open() -> Self {
        Self::with_caps(PlatformCapabilities {
            content_view: false,
            open_url: true,
            share: true,
        })
    }

    /// No actions at all
    pub(crate) fn bare() -> Self {
        Self::with_caps(PlatformCapabilities::default())
    }

    /// View and URL-open actions fail when invoked
    pub(crate) fn failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }

    /// Share sheet reports itself unavailable at delivery time
    pub(crate) fn without_share_at_runtime(mut self) -> Self {
        self.share_available = false;
        self
    }

    /// Share action fails when invoked
    pub(crate) fn failing_share(mut self) -> Self {
        self.share_fails = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        self.caps
    }

    async fn content_uri(&self, path: &Path) -> Result<String, DeliveryError> {
        self.record(PlatformCall::ContentUri(path.to_path_buf()));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("content://reports/{name}"))
    }

    async fn view(&self, request: ViewRequest<'_>) -> Result<(), DeliveryError> {
        self.record(PlatformCall::View {
            uri: request.uri.to_string(),
            mime_type: request.mime_type.to_string(),
            flags: request.flags,
        });
        if self.open_fails {
            return Err(DeliveryError::ActionFailed {
                action: "view",
                reason: "no activity found to handle intent".to_string(),
            });
        }
        Ok(())
    }

    async fn open_url(&self, url: &str) -> Result<(), DeliveryError> {
        self.record(PlatformCall::OpenUrl(url.to_string()));
        if self.open_fails {
            return Err(DeliveryError::ActionFailed {
                action: "open_url",
                reason: "cannot open URL".to_string(),
            });
        }
        Ok(())
    }

    async fn share_available(&self) -> bool {
        self.share_available
    }

    async fn share(&self, path: &Path, options: &ShareOptions) -> Result<(), DeliveryError> {
        self.record(PlatformCall::Share {
            path: path.to_path_buf(),
            mime_type: options.mime_type.clone(),
            uti: options.uti.clone(),
            dialog_title: options.dialog_title.clone(),
        });
        if self.share_fails {
            return Err(DeliveryError::ActionFailed {
                action: "share",
                reason: "share sheet dismissed with error".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Cache store that silently keeps only the first `keep` bytes of every write
pub(crate) struct TruncatingStore<S> {
    inner: S,
    keep: usize,
}

impl<S> TruncatingStore<S> {
    pub(crate) fn new(inner: S, keep: usize) -> Self {
        Self { inner, keep }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for TruncatingStore<S> {
    async fn write_base64(&self, path: &Path, content: &str) -> Result<(), PersistError> {
        let mut bytes = STANDARD
            .decode(content)
            .map_err(|e| PersistError::Decode(e.to_string()))?;
        bytes.truncate(self.keep);
        self.inner
            .write_base64(path, &encoding::encode(&bytes))
            .await
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo, PersistError> {
        self.inner.stat(path).await
    }

    async fn remove(&self, path: &Path) -> Result<(), PersistError> {
        self.inner.remove(path).await
    }
}

/// Cache store whose writes succeed but whose `stat` always fails
pub(crate) struct FailingStatStore<S> {
    inner: S,
}

impl<S> FailingStatStore<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CacheStore> CacheStore for FailingStatStore<S> {
    async fn write_base64(&self, path: &Path, content: &str) -> Result<(), PersistError> {
        self.inner.write_base64(path, content).await
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo, PersistError> {
        Err(PersistError::Io {
            operation: "stat",
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    async fn remove(&self, path: &Path) -> Result<(), PersistError> {
        self.inner.remove(path).await
    }
}
