/*!
 * Error types for the runalign application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider did not answer in time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::RequestFailed(format!("timeout: {}", error))
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while aligning one paragraph
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// The embedding provider failed
    #[error("Embedding provider error: {0}")]
    Embedding(#[source] ProviderError),

    /// The embedding provider returned vectors of differing dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the first vector of the call
        expected: usize,
        /// Offending dimension
        actual: usize,
    },

    /// The embedding provider returned the wrong number of vectors
    #[error("Embedding provider returned {actual} vectors for {expected} inputs")]
    EmbeddingCount {
        /// Number of inputs sent
        expected: usize,
        /// Number of vectors received
        actual: usize,
    },

    /// The translator capability failed
    #[error("Translator error: {0}")]
    Translator(#[source] ProviderError),

    /// The blocking scoring task panicked or was cancelled
    #[error("Alignment worker failed: {0}")]
    Worker(String),
}
