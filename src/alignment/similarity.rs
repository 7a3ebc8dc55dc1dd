/*!
 * Phrase-pair similarity scoring.
 *
 * A score is a weighted sum of four signals: embedding cosine similarity, a
 * semantic bonus from the phrase-mapping table (or an exact match), the word-count
 * ratio, and the Jaccard overlap of character sets.
 */

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::embedder::{Phrase, PhraseSet};

/// Bonus for a pair found in the phrase-mapping table
pub const MAPPING_BONUS: f64 = 0.4;

/// Bonus for phrases equal up to case
pub const EXACT_MATCH_BONUS: f64 = 0.5;

/// English to French seed mappings used when no glossary overrides them
static BUILTIN_MAPPINGS: &[(&str, &[&str])] = &[
    ("invisible", &["invisible", "caché", "masqué"]),
    ("disability", &["handicap", "invalidité", "incapacité"]),
    ("employees", &["employés", "salariés", "travailleurs"]),
    ("with", &["avec", "ayant", "portant"]),
    ("more likely", &["plus susceptibles", "plus probable"]),
    ("to be", &["d'être", "être"]),
    ("invisible disability", &["handicap invisible"]),
];

/// Immutable table of known phrase translations, keyed by lowercase source phrase
#[derive(Debug, Clone, Default)]
pub struct PhraseMappings {
    forward: HashMap<String, Vec<String>>,
    /// Lowercase (source, target) pairs for constant-time lookup in both directions
    pairs: HashSet<(String, String)>,
}

impl PhraseMappings {
    /// An empty table
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in English to French seed table
    pub fn builtin() -> Self {
        let mut mappings = Self::empty();
        for (source, targets) in BUILTIN_MAPPINGS {
            for target in targets.iter() {
                mappings.insert(source, target);
            }
        }
        mappings
    }

    /// Built-in seeds extended with extra mappings.
    ///
    /// Extra targets are appended to the seed targets of the same source, skipping
    /// ones already present.
    pub fn with_extra(extra: &HashMap<String, Vec<String>>) -> Self {
        let mut mappings = Self::builtin();
        mappings.extend(extra);
        mappings
    }

    /// Add every mapping of `extra` to the table
    pub fn extend(&mut self, extra: &HashMap<String, Vec<String>>) {
        // Sorted so the resulting target order does not depend on hash order
        let mut sources: Vec<&String> = extra.keys().collect();
        sources.sort();
        for source in sources {
            for target in &extra[source] {
                self.insert(source, target);
            }
        }
    }

    /// Add a single mapping, lowercasing both sides
    pub fn insert(&mut self, source: &str, target: &str) {
        let source = source.trim().to_lowercase();
        let target = target.trim().to_lowercase();
        if source.is_empty() || target.is_empty() {
            return;
        }
        let targets = self.forward.entry(source.clone()).or_default();
        if !targets.contains(&target) {
            targets.push(target.clone());
        }
        self.pairs.insert((source, target));
    }

    /// Targets known for a source phrase
    pub fn targets(&self, source: &str) -> Option<&[String]> {
        self.forward.get(&source.to_lowercase()).map(|v| v.as_slice())
    }

    /// Whether the two lowercase phrases map to each other in either direction
    pub fn contains_pair(&self, src_lower: &str, tgt_lower: &str) -> bool {
        self.pairs.contains(&(src_lower.to_string(), tgt_lower.to_string()))
            || self.pairs.contains(&(tgt_lower.to_string(), src_lower.to_string()))
    }

    /// Number of distinct source phrases
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Weights of the four scoring signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_embedding_weight")]
    pub embedding: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
    #[serde(default = "default_length_weight")]
    pub length: f64,
    #[serde(default = "default_character_weight")]
    pub character: f64,
}

fn default_embedding_weight() -> f64 {
    0.3
}

fn default_semantic_weight() -> f64 {
    0.4
}

fn default_length_weight() -> f64 {
    0.15
}

fn default_character_weight() -> f64 {
    0.15
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            embedding: default_embedding_weight(),
            semantic: default_semantic_weight(),
            length: default_length_weight(),
            character: default_character_weight(),
        }
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when lengths differ, either vector is empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Jaccard index of the lowercase character sets, spaces ignored
pub fn char_jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.to_lowercase().chars().filter(|c| *c != ' ').collect();
    let set_b: HashSet<char> = b.to_lowercase().chars().filter(|c| *c != ' ').collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Ratio of the smaller to the larger whitespace-separated word count
pub fn length_ratio(a: &str, b: &str) -> f64 {
    let words_a = a.split_whitespace().count();
    let words_b = b.split_whitespace().count();
    let max = words_a.max(words_b);
    if max == 0 {
        return 0.0;
    }
    words_a.min(words_b) as f64 / max as f64
}

/// Scores phrase pairs against a shared phrase-mapping table
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    mappings: Arc<PhraseMappings>,
    weights: ScoringWeights,
}

impl SimilarityScorer {
    pub fn new(mappings: Arc<PhraseMappings>, weights: ScoringWeights) -> Self {
        Self { mappings, weights }
    }

    pub fn mappings(&self) -> &PhraseMappings {
        &self.mappings
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Bonus from the mapping table; an exact case-insensitive match dominates
    pub fn semantic_bonus(&self, src: &str, tgt: &str) -> f64 {
        let src_lower = src.trim().to_lowercase();
        let tgt_lower = tgt.trim().to_lowercase();

        if src_lower == tgt_lower {
            EXACT_MATCH_BONUS
        } else if self.mappings.contains_pair(&src_lower, &tgt_lower) {
            MAPPING_BONUS
        } else {
            0.0
        }
    }

    /// Score one phrase pair
    pub fn score(&self, src: &str, tgt: &str, src_embedding: &[f32], tgt_embedding: &[f32]) -> f64 {
        let src = src.trim();
        let tgt = tgt.trim();

        cosine_similarity(src_embedding, tgt_embedding) * self.weights.embedding
            + self.semantic_bonus(src, tgt) * self.weights.semantic
            + length_ratio(src, tgt) * self.weights.length
            + char_jaccard(src, tgt) * self.weights.character
    }

    /// Full similarity matrix, indexed `[source phrase][target phrase]`
    pub fn matrix(&self, source: &PhraseSet, target: &PhraseSet) -> Vec<Vec<f64>> {
        source
            .phrases
            .iter()
            .zip(source.embeddings.iter())
            .map(|(src, src_emb)| self.row(src, src_emb, target))
            .collect()
    }

    /// Same as [`matrix`](Self::matrix), but stops between rows once `cancelled`
    /// is set and returns `None`
    pub fn matrix_until(&self, source: &PhraseSet, target: &PhraseSet, cancelled: &AtomicBool) -> Option<Vec<Vec<f64>>> {
        let mut rows = Vec::with_capacity(source.phrases.len());
        for (src, src_emb) in source.phrases.iter().zip(source.embeddings.iter()) {
            if cancelled.load(Ordering::Relaxed) {
                return None;
            }
            rows.push(self.row(src, src_emb, target));
        }
        Some(rows)
    }

    fn row(&self, src: &Phrase, src_emb: &[f32], target: &PhraseSet) -> Vec<f64> {
        target
            .phrases
            .iter()
            .zip(target.embeddings.iter())
            .map(|(tgt, tgt_emb)| self.score_phrases(src, tgt, src_emb, tgt_emb))
            .collect()
    }

    fn score_phrases(&self, src: &Phrase, tgt: &Phrase, src_emb: &[f32], tgt_emb: &[f32]) -> f64 {
        self.score(&src.text, &tgt.text, src_emb, tgt_emb)
    }
}
