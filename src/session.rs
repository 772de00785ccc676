//! Session credentials for authenticated report requests
//!
//! The login flow stores the server's cookies in a key-value store; this
//! module only reads them back. Credentials are fetched fresh for every run
//! and are never written by the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Cookie that carries the anti-request-forgery token
pub const FORGERY_COOKIE: &str = "csrf_access_token";

/// Key under which the login flow stores the cookie map
pub const COOKIES_KEY: &str = "cookies";

/// Credentials replayed on every report request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Anti-request-forgery token, sent as `X-CSRF-TOKEN`
    pub forgery_token: String,
    /// Session cookies, sent as a `Cookie` header
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl SessionCredentials {
    /// Credentials with only a forgery token
    pub fn new(forgery_token: impl Into<String>) -> Self {
        Self {
            forgery_token: forgery_token.into(),
            cookies: BTreeMap::new(),
        }
    }

    /// Build credentials from a stored cookie map
    ///
    /// A map without a forgery cookie still yields credentials with an empty
    /// token; the server answers such requests with 401.
    pub fn from_cookies(cookies: BTreeMap<String, String>) -> Self {
        let forgery_token = cookies.get(FORGERY_COOKIE).cloned().unwrap_or_default();
        Self {
            forgery_token,
            cookies,
        }
    }

    /// `Cookie` header value (`name=value; name=value`), or None without cookies
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Source of session credentials
///
/// Implementations return `Ok(None)` when no one is signed in; errors are
/// reserved for a store that exists but cannot be read.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current credentials, if a session is stored
    async fn credentials(&self) -> Result<Option<SessionCredentials>>;
}

/// Provider returning fixed credentials
///
/// Useful when the host keeps the session in memory, and in tests.
#[derive(Clone, Debug, Default)]
pub struct StaticSessionProvider {
    credentials: Option<SessionCredentials>,
}

impl StaticSessionProvider {
    /// Provider for a signed-in session
    pub fn new(credentials: SessionCredentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// Provider with no session
    pub fn signed_out() -> Self {
        Self { credentials: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn credentials(&self) -> Result<Option<SessionCredentials>> {
        Ok(self.credentials.clone())
    }
}

/// Provider backed by a JSON key-value file
///
/// The file is a JSON object; its `cookies` entry holds the cookie map either
/// as an object or as a JSON-encoded string, the form the login flow writes:
///
/// ```json
/// { "cookies": "{\"csrf_access_token\":\"abc\",\"access_token_cookie\":\"jwt\"}" }
/// ```
///
/// A missing file or a missing/null `cookies` entry means "signed out".
#[derive(Clone, Debug)]
pub struct FileSessionProvider {
    path: PathBuf,
}

impl FileSessionProvider {
    /// Read credentials from the given store file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, contents: &str) -> Result<Option<SessionCredentials>> {
        let store: BTreeMap<String, serde_json::Value> = serde_json::from_str(contents)?;

        let cookies = match store.get(COOKIES_KEY) {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::String(encoded)) => serde_json::from_str(encoded)?,
            Some(value) => value.clone(),
        };

        let serde_json::Value::Object(map) = cookies else {
            return Err(Error::InvalidSession(format!(
                "'{}' in {} is not a cookie map",
                COOKIES_KEY,
                self.path.display()
            )));
        };

        let cookies = map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect();

        Ok(Some(SessionCredentials::from_cookies(cookies)))
    }
}

#[async_trait]
impl SessionProvider for FileSessionProvider {
    async fn credentials(&self) -> Result<Option<SessionCredentials>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no session store found");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let credentials = self.parse(&contents)?;
        if credentials.is_none() {
            tracing::debug!(path = %self.path.display(), "session store has no cookies");
        }
        Ok(credentials)
    }
}
