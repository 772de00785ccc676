//! Test fixtures: report bodies, session stores and a recording platform

use async_trait::async_trait;
use report_dl::delivery::{Platform, PlatformCapabilities};
use report_dl::DeliveryError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minimal PDF-looking body of exactly `len` bytes
///
/// Starts with a PDF header and fills the rest with a repeating byte pattern
/// covering every byte value, so decode mistakes show up as content diffs.
pub fn pdf_body(len: usize) -> Vec<u8> {
    let header = b"%PDF-1.4\n";
    let mut body: Vec<u8> = header.iter().copied().take(len).collect();
    body.extend((0..len.saturating_sub(body.len())).map(|i| (i % 256) as u8));
    body
}

/// Write a session store the way the login flow does (cookie map as a JSON string)
pub fn write_session_store(dir: &Path, forgery_token: &str) -> PathBuf {
    let cookies = serde_json::json!({
        "csrf_access_token": forgery_token,
        "access_token_cookie": "jwt",
    });
    let store = serde_json::json!({ "cookies": cookies.to_string() });

    let path = dir.join("storage.json");
    std::fs::write(&path, store.to_string()).expect("failed to write session store");
    path
}

/// Desktop-like platform that records every URL it is asked to open
#[derive(Default)]
pub struct OpenRecorder {
    opened: Mutex<Vec<String>>,
    fail: bool,
}

impl OpenRecorder {
    /// Platform whose open action always fails
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// URLs passed to `open_url`, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Platform for OpenRecorder {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities {
            content_view: false,
            open_url: true,
            share: false,
        }
    }

    async fn open_url(&self, url: &str) -> Result<(), DeliveryError> {
        self.opened.lock().expect("lock poisoned").push(url.to_string());
        if self.fail {
            return Err(DeliveryError::ActionFailed {
                action: "open_url",
                reason: "no handler for application/pdf".to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "open-recorder"
    }
}
