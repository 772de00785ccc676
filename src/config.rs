//! Configuration types for report-dl

use crate::error::{Error, Result};
use crate::types::ReportPeriod;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Remote report endpoint settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// API base URL; reports live under `{base_url}/pdf/{year}/{month}`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each individual HTTP request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,

    /// Maximum number of requests per logical fetch, redirects included (default: 3)
    ///
    /// Redirects are followed manually so the forgery-token header survives
    /// cross-origin hops. A chain that is still redirecting after this many
    /// requests is treated as a redirect loop.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            max_hops: default_max_hops(),
        }
    }
}

/// Completion polling settings for the report job
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum polling attempts after the initial request (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay; attempt `n` waits `base_delay * n` (default: 1500ms)
    #[serde(default = "default_base_delay", with = "duration_ms")]
    pub base_delay: Duration,
}

impl PollConfig {
    /// Delay before polling attempt `attempt` (1-based), linear in the attempt number
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

/// Local cache settings for the persisted report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding cached reports (default: "./cache/reports")
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// File name prefix; files are named `{prefix}-{YYYY}-{MM}.pdf` (default: "informe")
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Smallest file size accepted as a real report (default: 100 bytes)
    #[serde(default = "default_min_artifact_bytes")]
    pub min_artifact_bytes: u64,
}

impl StorageConfig {
    /// Deterministic cache path for a report period
    pub fn artifact_path(&self, period: ReportPeriod) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{period}.pdf", self.file_prefix))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            file_prefix: default_file_prefix(),
            min_artifact_bytes: default_min_artifact_bytes(),
        }
    }
}

/// Presentation settings passed to platform open/share actions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// MIME type announced to viewers and share targets
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Uniform type identifier for share sheets that need one
    #[serde(default = "default_uti")]
    pub uti: String,

    /// Share sheet title
    #[serde(default = "default_dialog_title")]
    pub dialog_title: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mime_type: default_mime_type(),
            uti: default_uti(),
            dialog_title: default_dialog_title(),
        }
    }
}

/// Main configuration for [`crate::ReportPipeline`]
///
/// Every field has a default, so `Config::default()` targets the production
/// endpoint with the standard polling budget.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Completion polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Local cache settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Check the settings that would otherwise fail in the middle of a run
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.endpoint.max_hops == 0 {
            return Err(Error::Config {
                message: "max_hops must be at least 1".to_string(),
                key: Some("endpoint.max_hops".to_string()),
            });
        }

        if self.storage.min_artifact_bytes == 0 {
            return Err(Error::Config {
                message: "min_artifact_bytes must be greater than zero".to_string(),
                key: Some("storage.min_artifact_bytes".to_string()),
            });
        }

        if self.storage.file_prefix.contains(['/', '\\']) {
            return Err(Error::Config {
                message: format!(
                    "file_prefix '{}' must not contain path separators",
                    self.storage.file_prefix
                ),
                key: Some("storage.file_prefix".to_string()),
            });
        }

        Ok(())
    }

    /// Report URL for a period: `{base_url}/pdf/{year}/{month:02}`
    pub fn report_url(&self, period: ReportPeriod) -> Result<Url> {
        let base = self.base_url()?;
        let raw = format!(
            "{}/pdf/{}",
            base.as_str().trim_end_matches('/'),
            period.url_path()
        );
        Url::parse(&raw).map_err(|e| Error::Config {
            message: format!("cannot build report URL '{raw}': {e}"),
            key: Some("endpoint.base_url".to_string()),
        })
    }

    fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.endpoint.base_url, e),
            key: Some("endpoint.base_url".to_string()),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("unsupported URL scheme '{}'", url.scheme()),
                key: Some("endpoint.base_url".to_string()),
            });
        }

        Ok(url)
    }
}

fn default_base_url() -> String {
    "https://api.aimind.portablelab.work/api/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_hops() -> u32 {
    3
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache/reports")
}

fn default_file_prefix() -> String {
    "informe".to_string()
}

fn default_min_artifact_bytes() -> u64 {
    100
}

fn default_mime_type() -> String {
    "application/pdf".to_string()
}

fn default_uti() -> String {
    "com.adobe.pdf".to_string()
}

fn default_dialog_title() -> String {
    "Monthly report".to_string()
}

// Durations are written as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32, month: u32) -> ReportPeriod {
        ReportPeriod::new(year, month).unwrap()
    }

    #[test]
    fn defaults_match_the_report_contract() {
        let config = Config::default();
        assert_eq!(config.endpoint.max_hops, 3);
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.poll.base_delay, Duration::from_millis(1500));
        assert_eq!(config.storage.min_artifact_bytes, 100);
        assert_eq!(config.delivery.mime_type, "application/pdf");
        config.validate().unwrap();
    }

    #[test]
    fn poll_delay_is_linear_in_attempt_number() {
        let poll = PollConfig::default();
        assert_eq!(poll.delay_for(1), Duration::from_millis(1500));
        assert_eq!(poll.delay_for(2), Duration::from_millis(3000));
        assert_eq!(poll.delay_for(5), Duration::from_millis(7500));
    }

    #[test]
    fn report_url_pads_month() {
        let config = Config::default();
        let url = config.report_url(period(2025, 3)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.aimind.portablelab.work/api/v1/pdf/2025/03"
        );
    }

    #[test]
    fn report_url_tolerates_trailing_slash() {
        let mut config = Config::default();
        config.endpoint.base_url = "http://localhost:8080/api/v1/".to_string();
        let url = config.report_url(period(2024, 11)).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/pdf/2024/11");
    }

    #[test]
    fn artifact_path_is_deterministic_per_period() {
        let storage = StorageConfig {
            cache_dir: PathBuf::from("/var/cache/app"),
            ..Default::default()
        };
        assert_eq!(
            storage.artifact_path(period(2025, 1)),
            PathBuf::from("/var/cache/app/informe-2025-01.pdf")
        );
        assert_eq!(
            storage.artifact_path(period(2025, 1)),
            storage.artifact_path(period(2025, 1))
        );
        assert_ne!(
            storage.artifact_path(period(2025, 1)),
            storage.artifact_path(period(2025, 2))
        );
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.endpoint.base_url = "not a url".to_string();
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("endpoint.base_url")),
            other => panic!("expected config error, got {other:?}"),
        }

        config.endpoint.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_hops_and_zero_min_size() {
        let mut config = Config::default();
        config.endpoint.max_hops = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.min_artifact_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_prefix_with_separator() {
        let mut config = Config::default();
        config.storage.file_prefix = "../escape".to_string();
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("storage.file_prefix")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"endpoint": {"base_url": "http://127.0.0.1:9000"}, "poll": {"base_delay": 10}}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.endpoint.max_hops, 3);
        assert_eq!(config.poll.base_delay, Duration::from_millis(10));
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.storage.file_prefix, "informe");
    }

    #[test]
    fn durations_serialize_as_milliseconds() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["poll"]["base_delay"], 1500);
        assert_eq!(json["endpoint"]["request_timeout"], 30_000);
    }
}
