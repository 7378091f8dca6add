//! Shared HTTP client utilities

use crate::{EgressError, Result};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Maximum number of retries for idempotent requests (0 = no retry)
    pub max_retries: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            // Route handlers answer the browser, so an upstream that has not
            // replied within 5s is treated as down.
            timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            pool_max_idle_per_host: 32,
            max_retries: 0,
            user_agent: format!("BizOSaaS-Gateway/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_millis(config.timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the backends close them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EgressError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Longest sleep between two retries
pub const MAX_BACKOFF_MS: u64 = 5_000;

/// Exponential backoff before retry `attempt` (1-based): 100ms, 200ms, 400ms, capped
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(factor.saturating_mul(100).min(MAX_BACKOFF_MS))
}

/// Retry policy for transient errors
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_delay(attempt);
            debug!(
                "Retrying upstream request after {}ms (attempt {}/{})",
                backoff.as_millis(),
                attempt,
                max_retries
            );
            tokio::time::sleep(backoff).await;
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let should_retry = match &e {
                    EgressError::HttpError(req_err) => req_err.is_connect() || req_err.is_timeout(),
                    EgressError::Status { status, .. } => matches!(status, 502..=504),
                    EgressError::Timeout(_) => true,
                    _ => false,
                };

                if should_retry && attempt < max_retries {
                    warn!(
                        "Upstream request failed (attempt {}/{}): {}",
                        attempt + 1,
                        max_retries,
                        e
                    );
                    last_error = Some(e);
                } else {
                    return Err(e);
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| EgressError::ConfigError("Retry loop exited unexpectedly".to_string())))
}
