//! Built-in interceptors.

use crate::error::{RequestError, Result};
use crate::interceptor::{Chain, Interceptor};
use async_trait::async_trait;
use bridge_traits::RequestSuccess;
use core_async::time::{timeout, Duration, Instant};
use core_runtime::logging::{redact_if_sensitive, strip_query};
use tracing::{debug, info, warn};

/// Default limit applied by [`TimeoutInterceptor`] when the request sets
/// none.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Logs every request and its outcome.
///
/// URLs are logged without their query string and credential-like headers
/// are redacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInterceptor;

#[async_trait]
impl Interceptor for LogInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<RequestSuccess> {
        let params = chain.request_params();
        let method = params.method;
        let url = strip_query(&params.url).to_string();
        let mut headers: Vec<String> = params
            .header
            .iter()
            .map(|(name, value)| format!("{}: {}", name, redact_if_sensitive(name, value)))
            .collect();
        headers.sort();

        debug!(%method, %url, ?headers, "Sending request");
        let started = Instant::now();

        let result = chain.proceed().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => info!(
                %method,
                %url,
                status = response.status_code,
                elapsed_ms,
                "Request completed"
            ),
            Err(error) => warn!(%method, %url, elapsed_ms, error = %error, "Request failed"),
        }
        result
    }
}

/// Fails the request with [`RequestError::Timeout`] when it runs longer than
/// its `timeout` option (or the default), and aborts the host request.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutInterceptor {
    default: Duration,
}

impl TimeoutInterceptor {
    pub fn new(default: Duration) -> Self {
        Self { default }
    }
}

impl Default for TimeoutInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl Interceptor for TimeoutInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<RequestSuccess> {
        let limit = chain
            .request_params()
            .timeout_duration()
            .unwrap_or(self.default);
        let abort = chain.abort_handle();

        match timeout(limit, chain.proceed()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "Request timed out; aborting");
                abort.abort();
                Err(RequestError::Timeout(limit))
            }
        }
    }
}
