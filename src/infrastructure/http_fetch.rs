//! Resilient Fetch
//!
//! Wraps outbound HTTP calls with a per-request timeout and bounded
//! exponential-backoff retry, distinguishing retryable from terminal
//! failures.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;
/// Default retry budget (attempts beyond the first).
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// First backoff delay; doubles per attempt index.
const BACKOFF_BASE_MS: u64 = 300;

const USER_AGENT: &str = concat!("outlet-locator/", env!("CARGO_PKG_VERSION"));

/// How an outbound call can fail.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Deadline exceeded; the in-flight request was aborted.
    #[error("request timeout after {0}ms")]
    Timeout(u64),
    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Client errors (400-499 except 408) are terminal: retrying the
    /// same request cannot succeed. Everything else is retryable.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Status { status, .. } => (400..500).contains(status) && *status != 408,
            Self::Timeout(_) | Self::Transport(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Backoff before retry number `attempt` (0-based): 300ms, 600ms, 1200ms, ...
///
/// The canonical formula is `base * 2^attempt` seeded from the attempt
/// index; this is used uniformly at every call site.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS * 2u64.saturating_pow(attempt))
}

/// Shared HTTP client with timeout and retry policy baked in.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64, max_retries: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
        })
    }

    /// GET a JSON document, retrying retryable failures up to the
    /// configured budget and surfacing the last error after exhaustion.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 0..=self.max_retries {
            match self.get_json_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if err.is_terminal() || attempt == self.max_retries {
                        return Err(err);
                    }
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        remaining = self.max_retries - attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    last_err = Some(err);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Unreachable: the loop always returns on the final attempt.
        Err(last_err.unwrap_or(FetchError::Transport("retry budget exhausted".into())))
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
