/*!
 * Provider implementations for the remote services the aligners depend on.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server (generation and embeddings)
 * - OpenAI: OpenAI API and OpenAI-compatible servers such as LM Studio
 * - Anthropic: Anthropic API integration
 * - Mock: Deterministic translator and embedder used by tests
 *
 * All clients share one retry policy: server errors, rate limiting and network
 * failures are retried with exponential backoff; other client errors are not.
 */

use async_trait::async_trait;
use log::error;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Common trait for the completion clients
///
/// Lets the translator drive any backend the same way.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Send a minimal request to check that the backend answers
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Client-side request pacing from a requests-per-minute budget
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter; `None` or zero disables pacing
    pub fn new(requests_per_minute: Option<u32>) -> Self {
        let min_interval = match requests_per_minute {
            Some(rpm) if rpm > 0 => Duration::from_millis(60_000 / rpm as u64),
            _ => Duration::ZERO,
        };
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next request slot is available
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let delay = {
            let mut next_slot = self.next_slot.lock();
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot.saturating_duration_since(now)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Retry policy shared by the HTTP clients
#[derive(Debug)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Base backoff in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
    limiter: RateLimiter,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64, rate_limit: Option<u32>) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            limiter: RateLimiter::new(rate_limit),
        }
    }

    /// Run `request` until it succeeds, fails permanently, or retries run out
    pub async fn execute<T, F, Fut>(&self, label: &str, mut request: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            self.limiter.acquire().await;

            let error = match request().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => e,
            };

            error!("{} request failed: {} - attempt {}/{}", label, error, attempt + 1, self.max_retries + 1);
            if attempt >= self.max_retries {
                return Err(error);
            }

            attempt += 1;
            let backoff_ms = self.backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000, None)
    }
}

/// Whether an error is worth another attempt
pub fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        ProviderError::RateLimitExceeded(_)
        | ProviderError::ConnectionError(_)
        | ProviderError::RequestFailed(_)
        | ProviderError::Timeout(_) => true,
        ProviderError::ParseError(_) | ProviderError::AuthenticationError(_) => false,
    }
}

/// Map an unsuccessful HTTP status and body to a provider error
pub fn status_error(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(body),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message: body,
        },
    }
}

/// Read an error body without failing on unreadable responses
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string())
}

/// First 500 characters of a body, for log messages
pub(crate) fn excerpt(text: &str) -> String {
    text.chars().take(500).collect()
}
