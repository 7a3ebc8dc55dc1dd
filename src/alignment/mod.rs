/*!
 * Formatting alignment engine.
 *
 * Given a source paragraph split into formatting runs and a plain translation of
 * its text, the aligners in this module build a new run sequence over the
 * translation that carries the source formatting onto the matching target words.
 *
 * - `tokenizer`: whitespace-preserving word segmentation
 * - `embedder`: phrase enumeration and embedding providers
 * - `similarity`: phrase-pair scoring and the phrase-mapping table
 * - `solver`: greedy overlap-excluding alignment
 * - `run_mapper`: source word to source run mapping
 * - `builder`: target run construction shared by both strategies
 * - `embedding_aligner`: the phrase-embedding strategy
 * - `llm_aligner`: the per-term lookup strategy
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::errors::AlignmentError;

pub mod builder;
pub mod debug;
pub mod embedder;
pub mod embedding_aligner;
pub mod llm_aligner;
pub mod run;
pub mod run_mapper;
pub mod similarity;
pub mod solver;
pub mod tokenizer;

pub use debug::{AlignmentDebug, AlignmentType};
pub use embedder::{EmbeddingProvider, HashedEmbedder, Phrase, PhraseEmbedder};
pub use embedding_aligner::EmbeddingAligner;
pub use llm_aligner::LlmAligner;
pub use run::{Run, RunFormat};
pub use similarity::{PhraseMappings, ScoringWeights, SimilarityScorer};
pub use solver::{AlignmentSolver, Thresholds};

/// Target runs for one paragraph plus the trace that explains them
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutcome {
    pub runs: Vec<Run>,
    pub debug: Option<AlignmentDebug>,
}

impl AlignmentOutcome {
    pub fn new(runs: Vec<Run>, debug: Option<AlignmentDebug>) -> Self {
        Self { runs, debug }
    }
}

/// Alignment strategy selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentStrategy {
    /// Phrase embeddings, similarity scoring and greedy alignment
    #[default]
    Embedding,
    /// One translator query per formatted term
    Llm,
}

impl fmt::Display for AlignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentStrategy::Embedding => write!(f, "embedding"),
            AlignmentStrategy::Llm => write!(f, "llm"),
        }
    }
}

/// Tunables of the embedding strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignerOptions {
    /// Longest phrase, in words, considered as a matching unit
    pub max_phrase_length: usize,
    pub thresholds: Thresholds,
    pub weights: ScoringWeights,
}

impl Default for AlignerOptions {
    fn default() -> Self {
        Self {
            max_phrase_length: 4,
            thresholds: Thresholds::default(),
            weights: ScoringWeights::default(),
        }
    }
}

/// A strategy that redistributes source formatting over a translation
///
/// Implementations must return runs whose texts concatenate to exactly
/// `target_text`, and must never modify the source runs.
#[async_trait]
pub trait FormattingAligner: Send + Sync + Debug {
    /// Strategy implemented by this aligner
    fn strategy(&self) -> AlignmentStrategy;

    /// Align one paragraph
    async fn align(
        &self,
        source_text: &str,
        target_text: &str,
        runs: &[Run],
    ) -> Result<AlignmentOutcome, AlignmentError>;
}
