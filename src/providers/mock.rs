/*!
 * Mock providers for testing.
 *
 * - `MockTranslator` answers term lookups from a table, or fails, stalls or
 *   returns nothing on demand
 * - `MockEmbedder` returns fixed vectors for known phrases and hashed vectors
 *   for everything else
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::alignment::{EmbeddingProvider, HashedEmbedder};
use crate::errors::ProviderError;
use crate::translator::Translator;

/// Behavior mode for the mocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty answers
    Empty,
    /// Sleeps before answering (for timeout testing)
    Slow { delay_ms: u64 },
}

impl MockBehavior {
    /// Apply the behavior for request number `count`; `Ok(true)` means answer normally
    async fn gate(&self, count: usize) -> Result<bool, ProviderError> {
        match *self {
            MockBehavior::Working => Ok(true),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(true)
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Empty => Ok(false),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(true)
            }
        }
    }
}

/// Translator answering term lookups from a table
///
/// The term is read from the `Find where "<term>" appears` line of the
/// prompt; unknown terms are answered with the term itself.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    answers: HashMap<String, String>,
    request_count: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            answers: HashMap::new(),
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working translator that echoes terms
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a translator that answers with empty text
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a translator that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Answer lookups for `term` with `answer`
    pub fn with_answer(mut self, term: impl Into<String>, answer: impl Into<String>) -> Self {
        self.answers.insert(term.into(), answer.into());
        self
    }

    /// Number of prompts received so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn term_of(prompt: &str) -> Option<&str> {
        let rest = prompt.split("Find where \"").nth(1)?;
        rest.split('"').next()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _context: Option<&str>) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(text.to_string());

        if !self.behavior.gate(count).await? {
            return Ok(String::new());
        }

        let term = Self::term_of(text).unwrap_or(text);
        Ok(self.answers.get(term).cloned().unwrap_or_else(|| term.to_string()))
    }
}

/// Embedder with pinned vectors for chosen phrases
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    behavior: MockBehavior,
    vectors: HashMap<String, Vec<f32>>,
    fallback: HashedEmbedder,
    /// When set, every vector has this many dimensions regardless of the table
    forced_dimensions: Option<usize>,
    request_count: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(behavior: MockBehavior, dimensions: usize) -> Self {
        Self {
            behavior,
            vectors: HashMap::new(),
            fallback: HashedEmbedder::new(dimensions),
            forced_dimensions: None,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a working embedder with hashed fallback vectors
    pub fn working(dimensions: usize) -> Self {
        Self::new(MockBehavior::Working, dimensions)
    }

    /// Create an embedder that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing, 8)
    }

    /// Create an embedder that waits before every vector
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms }, 8)
    }

    /// Pin the vector returned for `phrase`
    pub fn with_vector(mut self, phrase: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(phrase.into(), vector);
        self
    }

    /// Return vectors of `dimensions` length for every input after the first
    pub fn with_wrong_dimensions(mut self, dimensions: usize) -> Self {
        self.forced_dimensions = Some(dimensions);
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if !self.behavior.gate(count).await? {
            return Ok(Vec::new());
        }

        if let Some(dimensions) = self.forced_dimensions {
            if count > 0 {
                return Ok(vec![0.5; dimensions]);
            }
        }

        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.vector(text)))
    }
}
