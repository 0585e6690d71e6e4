use std::time::Duration;

use async_trait::async_trait;
use http::header::RETRY_AFTER;
use http::{HeaderMap, StatusCode};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::sources::WorkUnit;

/// Outcome of a single fetch. Rate limiting is a value, not an error, so
/// the orchestrator can apply a different policy (wait-and-retry) than it
/// does for hard failures (skip-and-continue).
#[derive(Debug)]
pub enum FetchOutcome {
    Payload(serde_json::Value),
    RateLimited { retry_after: Duration },
}

#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, unit: &WorkUnit) -> Result<FetchOutcome>;
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_after_default: Duration,
    retry_after_max: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            retry_after_default: Duration::from_secs(config.retry_after_default_seconds),
            retry_after_max: Duration::from_secs(config.retry_after_max_seconds),
        })
    }
}

#[async_trait]
impl Fetch for HttpClient {
    /// One GET, no internal retries. A 429 maps to `RateLimited` with the
    /// coerced `Retry-After` hint; any other non-2xx status or a body that
    /// is not valid JSON is a hard failure.
    async fn fetch(&self, unit: &WorkUnit) -> Result<FetchOutcome> {
        debug!(unit = %unit.label, url = %unit.url, "Sending request");

        let response = self
            .client
            .get(&unit.url)
            .query(&unit.params)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(
                response.headers(),
                self.retry_after_default,
                self.retry_after_max,
            );
            warn!(
                unit = %unit.label,
                retry_after_secs = retry_after.as_secs(),
                "Rate limited by API"
            );
            return Ok(FetchOutcome::RateLimited { retry_after });
        }

        let response = response.error_for_status()?;
        let body = response.bytes().await?;

        let payload = serde_json::from_slice(&body).map_err(|e| {
            warn!(
                unit = %unit.label,
                error = %e,
                body = %String::from_utf8_lossy(&body),
                "Invalid JSON response"
            );
            Error::Json(e)
        })?;

        debug!(unit = %unit.label, status = status.as_u16(), "Response received");
        Ok(FetchOutcome::Payload(payload))
    }
}

/// Coerces a free-form `Retry-After` header to whole seconds, falling back
/// to `default` when absent or malformed and clamping at `max` so a hostile
/// header can never stall a cycle indefinitely.
fn parse_retry_after(headers: &HeaderMap, default: Duration, max: Duration) -> Duration {
    let hinted = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default);

    hinted.min(max)
}
