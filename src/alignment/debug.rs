/*!
 * Alignment trace written to the debug stream.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::solver::RejectionReason;

/// Which path produced the target runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentType {
    /// One source run applied to the whole target text
    SingleRun,
    /// Phrase alignment over several source runs
    MultiRun,
    /// Per-term lookup through the translator
    LlmIndividual,
    /// Several runs but none of them special
    NoFormatting,
}

/// Formatting summary of the run behind an alignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceFormattingDebug {
    pub bold: Option<bool>,
    pub color: Option<String>,
}

/// One accepted phrase alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseAlignmentDebug {
    pub source_phrase: String,
    pub target_phrase: String,
    pub similarity: f64,
    pub source_word_indices: Vec<usize>,
    pub target_word_indices: Vec<usize>,
    pub source_run_index: Option<usize>,
    pub source_formatting: SourceFormattingDebug,
}

/// One near miss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedMatchDebug {
    pub source_phrase: String,
    pub target_phrase: String,
    pub similarity: f64,
    pub reason: RejectionReason,
}

/// Outcome of the per-term lookups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermMappingDebug {
    pub formatted_runs_count: usize,
    pub successful_mappings: usize,
    pub failed_mappings: usize,
    /// Source term to the answer the translator gave for it
    pub individual_mappings: BTreeMap<String, String>,
}

/// Debug trace of one paragraph alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentDebug {
    pub alignment_type: AlignmentType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_words: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_words: Vec<String>,

    #[serde(default)]
    pub phrase_alignments: Vec<PhraseAlignmentDebug>,

    #[serde(default)]
    pub rejected_matches: Vec<RejectedMatchDebug>,

    #[serde(flatten)]
    pub term_mapping: Option<TermMappingDebug>,
}

impl AlignmentDebug {
    /// A trace with no alignment details
    pub fn of_type(alignment_type: AlignmentType) -> Self {
        Self {
            alignment_type,
            source_words: Vec::new(),
            target_words: Vec::new(),
            phrase_alignments: Vec::new(),
            rejected_matches: Vec::new(),
            term_mapping: None,
        }
    }
}

/// Round a score to four decimals for display
pub fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
