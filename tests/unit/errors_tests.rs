/*!
 * Tests for error types and conversions
 */

use runalign::errors::{AlignmentError, ProviderError};

#[test]
fn test_providerError_requestFailed_shouldDisplayCorrectly() {
    let error = ProviderError::RequestFailed("Connection timeout".to_string());
    let display = format!("{}", error);
    assert!(display.contains("API request failed"));
    assert!(display.contains("Connection timeout"));
}

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 429,
        message: "Too many requests".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("429"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_providerError_timeout_shouldDisplaySeconds() {
    let error = ProviderError::Timeout(30);
    assert_eq!(error.to_string(), "Request timed out after 30 seconds");
}

#[test]
fn test_alignmentError_dimensionMismatch_shouldDisplayBothSizes() {
    let error = AlignmentError::DimensionMismatch { expected: 768, actual: 384 };
    assert_eq!(error.to_string(), "Embedding dimension mismatch: expected 768, got 384");
}

#[test]
fn test_alignmentError_embedding_shouldKeepSource() {
    let error = AlignmentError::Embedding(ProviderError::ConnectionError("refused".to_string()));
    assert!(error.to_string().contains("refused"));
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_alignmentError_worker_shouldDisplayReason() {
    let error = AlignmentError::Worker("alignment cancelled".to_string());
    assert_eq!(error.to_string(), "Alignment worker failed: alignment cancelled");
}
