// erasure-core/src/infrastructure/http.rs
//
// Outbound HTTP shared by the catalog and tokenization clients:
// fixed timeout, bounded retry with exponential backoff on transient failures.

use reqwest::{Certificate, Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use crate::infrastructure::config::HttpSettings;
use crate::infrastructure::error::InfrastructureError;

/// Retry budget for outbound calls. Besides the transient statuses (see [`is_transient`]),
/// failures to connect and request timeouts are retried too, with the same backoff.
/// Any other transport error is returned at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &HttpSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`.
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// 500, 502, 503 and 504 are retried. Every other status, 4xx included, is final.
pub fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

pub fn build_client(
    settings: &HttpSettings,
    root_certificate: Option<Certificate>,
    accept_invalid_certs: bool,
) -> Result<Client, InfrastructureError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .danger_accept_invalid_certs(accept_invalid_certs);
    if let Some(cert) = root_certificate {
        builder = builder.add_root_certificate(cert);
    }
    Ok(builder.build()?)
}

/// Sends the request, retrying transient statuses and connect/timeout failures.
/// The last response is returned as-is once retries are exhausted; callers check the status.
pub async fn send_with_retry(
    request: RequestBuilder,
    policy: &RetryPolicy,
) -> Result<Response, InfrastructureError> {
    let mut retry = 0;
    loop {
        let Some(attempt) = request.try_clone() else {
            // Streaming bodies cannot be replayed.
            return Ok(request.send().await?);
        };

        match attempt.send().await {
            Ok(response) if is_transient(response.status()) && retry < policy.max_retries => {
                retry += 1;
                warn!(
                    status = %response.status(),
                    url = %response.url(),
                    retry,
                    "Transient HTTP status, retrying"
                );
            }
            Ok(response) => return Ok(response),
            Err(err) if (err.is_connect() || err.is_timeout()) && retry < policy.max_retries => {
                retry += 1;
                warn!(error = %err, retry, "HTTP request failed, retrying");
            }
            Err(err) => return Err(err.into()),
        }

        tokio::time::sleep(policy.delay(retry)).await;
    }
}
