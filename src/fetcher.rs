//! Authenticated report fetch with manual redirect handling
//!
//! The HTTP client is built with automatic redirects disabled: following a
//! redirect automatically drops custom headers on cross-origin or
//! scheme-changing hops, and the report endpoint needs the forgery token on
//! every hop. [`ReportFetcher::fetch`] therefore walks the redirect chain
//! itself, resolving each `Location` against the current URL and replaying
//! the original headers.

use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, RETRY_AFTER,
};
use std::time::Duration;
use url::Url;

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::session::SessionCredentials;
use crate::types::FetchOutcome;

/// Statuses handled as redirects
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Header carrying the anti-request-forgery token
pub const FORGERY_TOKEN_HEADER: &str = "x-csrf-token";

/// AJAX marker header expected by the API
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// GET client for the report endpoint
#[derive(Clone, Debug)]
pub struct ReportFetcher {
    client: reqwest::Client,
    max_hops: u32,
}

impl ReportFetcher {
    /// Create a fetcher from endpoint settings
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            max_hops: config.max_hops.max(1),
        })
    }

    /// Request headers for the report endpoint
    ///
    /// `Accept: application/pdf`, the forgery token, the AJAX marker, and the
    /// stored cookies (the client has no cookie jar of its own).
    pub fn report_headers(credentials: &SessionCredentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/pdf"));
        headers.insert(
            HeaderName::from_static(FORGERY_TOKEN_HEADER),
            HeaderValue::from_str(&credentials.forgery_token).map_err(|_| {
                Error::InvalidSession(
                    "forgery token contains characters not allowed in a header".to_string(),
                )
            })?,
        );
        headers.insert(
            HeaderName::from_static(REQUESTED_WITH_HEADER),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        if let Some(cookie) = credentials.cookie_header() {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&cookie).map_err(|_| {
                    Error::InvalidSession(
                        "stored cookies contain characters not allowed in a header".to_string(),
                    )
                })?,
            );
        }

        Ok(headers)
    }

    /// Perform one logical GET, following up to `max_hops - 1` redirects
    ///
    /// Never returns [`FetchOutcome::Redirect`]: a chain that is still
    /// redirecting on the last allowed request, or a redirect without a
    /// usable `Location`, becomes [`FetchOutcome::TransportFailure`].
    pub async fn fetch(&self, url: &Url, headers: &HeaderMap) -> FetchOutcome {
        let mut current = url.clone();

        for hop in 1..=self.max_hops {
            match self.fetch_once(&current, headers).await {
                FetchOutcome::Redirect(next) => {
                    tracing::debug!(
                        from = %current,
                        to = %next,
                        hop = hop,
                        max_hops = self.max_hops,
                        "following redirect"
                    );
                    current = next;
                }
                outcome => return outcome,
            }
        }

        tracing::warn!(
            url = %url,
            max_hops = self.max_hops,
            "redirect chain did not terminate"
        );
        FetchOutcome::TransportFailure(format!(
            "too many redirects fetching {url} (limit {})",
            self.max_hops
        ))
    }

    /// Issue exactly one GET and classify the response without following redirects
    pub async fn fetch_once(&self, url: &Url, headers: &HeaderMap) -> FetchOutcome {
        let response = match self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timeout fetching {url}")
                } else if e.is_connect() {
                    format!("connection failed for {url}: {e}")
                } else {
                    format!("request to {url} failed: {e}")
                };
                tracing::warn!(url = %url, error = %e, "report request failed");
                return FetchOutcome::TransportFailure(reason);
            }
        };

        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "report endpoint responded");

        if REDIRECT_STATUSES.contains(&status.as_u16()) {
            return resolve_redirect(url, status, response.headers());
        }

        match status {
            StatusCode::UNAUTHORIZED => FetchOutcome::Unauthorized,
            StatusCode::ACCEPTED => FetchOutcome::Pending(retry_after(response.headers())),
            s if s.is_success() => match response.bytes().await {
                Ok(body) => FetchOutcome::Success(body.to_vec()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "failed to read report body");
                    FetchOutcome::TransportFailure(format!(
                        "failed to read response body from {url}: {e}"
                    ))
                }
            },
            s => FetchOutcome::ServerError(s.as_u16()),
        }
    }
}

/// Resolve a redirect's `Location` against the URL that produced it
fn resolve_redirect(url: &Url, status: StatusCode, headers: &HeaderMap) -> FetchOutcome {
    let Some(location) = headers.get(LOCATION) else {
        return FetchOutcome::TransportFailure(format!(
            "redirect {} from {url} has no Location header",
            status.as_u16()
        ));
    };

    let Ok(location) = location.to_str() else {
        return FetchOutcome::TransportFailure(format!(
            "redirect {} from {url} has a non-text Location header",
            status.as_u16()
        ));
    };

    match url.join(location) {
        Ok(next) => FetchOutcome::Redirect(next),
        Err(e) => FetchOutcome::TransportFailure(format!(
            "redirect from {url} to invalid location '{location}': {e}"
        )),
    }
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
