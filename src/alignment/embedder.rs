/*!
 * Phrase enumeration and embedding.
 *
 * Every word and every window of 2..=L consecutive words becomes a phrase
 * candidate. Each candidate is embedded through an [`EmbeddingProvider`], which
 * may be a remote model (see `providers::ollama`) or the local [`HashedEmbedder`].
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use crate::errors::{AlignmentError, ProviderError};

use super::tokenizer::{is_separator, tokenize, Word};

/// Source of text embeddings
///
/// Any deterministic `text -> vector` function satisfies the contract.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Embed several texts, returning one vector per input in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// A candidate span of 1..=L words
#[derive(Debug, Clone, PartialEq)]
pub struct Phrase {
    /// Phrase text with surrounding whitespace trimmed
    pub text: String,
    /// First word index (inclusive)
    pub start: usize,
    /// Last word index (inclusive)
    pub end: usize,
}

impl Phrase {
    /// Number of words covered by the span
    pub fn word_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether two phrases share a word index
    pub fn overlaps(&self, other: &Phrase) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Word indices covered by the phrase
    pub fn word_indices(&self) -> Vec<usize> {
        (self.start..=self.end).collect()
    }
}

/// Words of a text with their phrase candidates and embeddings
#[derive(Debug, Clone)]
pub struct PhraseSet {
    pub words: Vec<Word>,
    pub phrases: Vec<Phrase>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Enumerate phrase candidates for a tokenized text.
///
/// Single words come first in word order, then windows of length 2, 3, ... up to
/// `max_len`. Blank words and blank windows are skipped.
pub fn enumerate_phrases(words: &[Word], max_len: usize) -> Vec<Phrase> {
    let mut phrases = Vec::new();

    for (idx, word) in words.iter().enumerate() {
        if word.is_blank() {
            continue;
        }
        phrases.push(Phrase {
            text: word.content().to_string(),
            start: idx,
            end: idx,
        });
    }

    for len in 2..=max_len.min(words.len()) {
        for start in 0..=(words.len() - len) {
            let joined: String = words[start..start + len]
                .iter()
                .map(|w| w.text.as_str())
                .collect();
            let trimmed = joined.trim_matches(is_separator);
            if trimmed.is_empty() {
                continue;
            }
            phrases.push(Phrase {
                text: trimmed.to_string(),
                start,
                end: start + len - 1,
            });
        }
    }

    phrases
}

/// Produces embedded phrase candidates for paragraph texts
#[derive(Debug, Clone, Copy)]
pub struct PhraseEmbedder {
    max_phrase_length: usize,
}

impl PhraseEmbedder {
    pub fn new(max_phrase_length: usize) -> Self {
        Self {
            max_phrase_length: max_phrase_length.max(1),
        }
    }

    pub fn max_phrase_length(&self) -> usize {
        self.max_phrase_length
    }

    /// Tokenize, enumerate phrases and embed each distinct phrase text once
    pub async fn embed(
        &self,
        text: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<PhraseSet, AlignmentError> {
        let words = tokenize(text);
        let phrases = enumerate_phrases(&words, self.max_phrase_length);

        let mut unique: Vec<String> = Vec::new();
        let mut slot_of: HashMap<&str, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(phrases.len());
        for phrase in &phrases {
            let slot = *slot_of.entry(phrase.text.as_str()).or_insert_with(|| {
                unique.push(phrase.text.clone());
                unique.len() - 1
            });
            slots.push(slot);
        }

        let vectors = if unique.is_empty() {
            Vec::new()
        } else {
            provider
                .embed_batch(&unique)
                .await
                .map_err(AlignmentError::Embedding)?
        };

        if vectors.len() != unique.len() {
            return Err(AlignmentError::EmbeddingCount {
                expected: unique.len(),
                actual: vectors.len(),
            });
        }
        if let Some(first) = vectors.first() {
            let expected = first.len();
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(AlignmentError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }

        let embeddings = slots.into_iter().map(|slot| vectors[slot].clone()).collect();

        Ok(PhraseSet {
            words,
            phrases,
            embeddings,
        })
    }
}

/// Deterministic offline embedder built from hashed character trigrams.
///
/// Text is lowercased and padded with spaces, every character trigram is hashed
/// into one of `dimensions` buckets, and the bucket counts are L2-normalized.
/// Texts sharing spelling get similar vectors; there is no cross-lingual semantics.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dimensions: usize,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Compute the embedding synchronously
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0f32; self.dimensions];
        let padded: Vec<char> = format!(" {} ", text.trim().to_lowercase()).chars().collect();

        for window in padded.windows(3) {
            let mut hasher = DefaultHasher::new();
            window.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            buckets[bucket] += 1.0;
        }

        let norm = buckets.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut buckets {
                *value /= norm;
            }
        }
        buckets
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.vector(text))
    }
}
