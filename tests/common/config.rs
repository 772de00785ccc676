//! Test configuration helpers for building pipelines against a mock report server

use report_dl::session::{SessionCredentials, StaticSessionProvider};
use report_dl::{Config, ReportPipeline, SessionProvider};
use std::sync::{Arc, Once};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

use super::fixtures::OpenRecorder;

/// Forgery token used by signed-in test sessions
pub const TEST_TOKEN: &str = "test-csrf-token";

static TRACING: Once = Once::new();

/// Route pipeline logs to the test output
///
/// Honors `RUST_LOG`; defaults to debug output for this crate only.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("report_dl=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Config pointing at `server` with the cache in `cache` and short poll delays
pub fn test_config(server: &MockServer, cache: &TempDir) -> Config {
    let mut config = Config::default();
    config.endpoint.base_url = format!("{}/api/v1", server.uri());
    config.endpoint.request_timeout = Duration::from_secs(5);
    config.poll.base_delay = Duration::from_millis(10);
    config.storage.cache_dir = cache.path().join("reports");
    config
}

/// Session with a forgery token and an access cookie
pub fn signed_in() -> Arc<dyn SessionProvider> {
    let mut credentials = SessionCredentials::new(TEST_TOKEN);
    credentials
        .cookies
        .insert("access_token_cookie".to_string(), "jwt".to_string());
    Arc::new(StaticSessionProvider::new(credentials))
}

/// Session store with nothing in it
pub fn signed_out() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSessionProvider::signed_out())
}

/// Pipeline wired to `server`, a fresh cache directory and a recording opener
pub fn create_test_pipeline(
    server: &MockServer,
    session: Arc<dyn SessionProvider>,
) -> (ReportPipeline, TempDir, Arc<OpenRecorder>) {
    init_tracing();

    let cache = TempDir::new().expect("failed to create cache dir");
    let platform = Arc::new(OpenRecorder::default());
    let pipeline = ReportPipeline::new(test_config(server, &cache), session, platform.clone())
        .expect("test config should be valid");

    (pipeline, cache, platform)
}
