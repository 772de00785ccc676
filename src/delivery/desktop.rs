//! Desktop platform using the system file opener

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use super::traits::{Platform, PlatformCapabilities};
use crate::error::DeliveryError;

#[cfg(target_os = "macos")]
const OPENER_CANDIDATES: &[&str] = &["open"];
#[cfg(target_os = "windows")]
const OPENER_CANDIDATES: &[&str] = &["cmd"];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER_CANDIDATES: &[&str] = &["xdg-open"];

/// Arguments placed before the URL
///
/// `explorer` exits non-zero even after opening a file, so Windows goes
/// through `start`, whose exit status reflects whether a handler was found.
/// The empty argument is the window title `start` expects first.
#[cfg(target_os = "windows")]
const OPENER_ARGS: &[&str] = &["/C", "start", ""];
#[cfg(not(target_os = "windows"))]
const OPENER_ARGS: &[&str] = &[];

/// Desktop platform that opens files with an external opener binary
///
/// Desktops have no content URIs and no share sheet, so only the URL-open
/// action is offered, and only when an opener was found.
///
/// # Examples
///
/// ```no_run
/// use report_dl::delivery::{DesktopPlatform, Platform};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let platform = DesktopPlatform::from_path();
/// if platform.capabilities().open_url {
///     platform.open_url("file:///tmp/informe-2025-01.pdf").await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct DesktopPlatform {
    opener: Option<PathBuf>,
    opener_args: Vec<String>,
}

impl DesktopPlatform {
    /// Create with an explicit opener binary
    pub fn new(opener: PathBuf) -> Self {
        Self {
            opener: Some(opener),
            opener_args: Vec::new(),
        }
    }

    /// Pass `args` to the opener ahead of the URL
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.opener_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Look up the platform's opener in PATH
    ///
    /// Uses the `which` crate; the platform has no open action if nothing is found.
    pub fn from_path() -> Self {
        let opener = OPENER_CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok());
        if opener.is_none() {
            tracing::debug!(candidates = ?OPENER_CANDIDATES, "no file opener found in PATH");
        }
        Self {
            opener,
            opener_args: OPENER_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Opener binary in use, if any
    pub fn opener(&self) -> Option<&PathBuf> {
        self.opener.as_ref()
    }

    /// Arguments passed ahead of the URL
    pub fn opener_args(&self) -> &[String] {
        &self.opener_args
    }
}

#[async_trait]
impl Platform for DesktopPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            content_view: false,
            open_url: self.opener.is_some(),
            share: false,
        }
    }

    async fn open_url(&self, url: &str) -> Result<(), DeliveryError> {
        let opener = self
            .opener
            .as_ref()
            .ok_or(DeliveryError::Unavailable { action: "open_url" })?;

        let status = Command::new(opener)
            .args(&self.opener_args)
            .arg(url)
            .status()
            .await
            .map_err(|e| DeliveryError::ActionFailed {
                action: "open_url",
                reason: format!("failed to execute {}: {}", opener.display(), e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DeliveryError::ActionFailed {
                action: "open_url",
                reason: format!("{} exited with {}", opener.display(), status),
            })
        }
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}
