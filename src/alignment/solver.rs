/*!
 * Greedy phrase alignment.
 *
 * Pairs are visited from the highest score down. A pair is accepted when it clears
 * the active threshold and neither of its word spans touches a word already claimed
 * by an earlier acceptance. The result is not globally optimal.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::embedder::Phrase;

/// Pairs scoring below this never show up as near misses
const NEAR_MISS_FLOOR: f64 = 0.2;

/// How many of the best pairs are inspected for near misses
const NEAR_MISS_WINDOW: usize = 20;

/// Maximum number of near misses reported
const NEAR_MISS_LIMIT: usize = 10;

/// An accepted pairing of one source phrase with one target phrase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    pub source_phrase: usize,
    pub target_phrase: usize,
    pub score: f64,
}

/// Why a high-scoring pair was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    BelowThreshold,
    Overlap,
}

/// A near miss kept for the debug trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RejectedMatch {
    pub source_phrase: usize,
    pub target_phrase: usize,
    pub score: f64,
    pub reason: RejectionReason,
}

/// Acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Threshold for plain source phrases
    pub base: f64,
    /// Floor applied to source phrases touching bold or colored text
    pub formatted: f64,
}

impl Thresholds {
    pub fn new(base: f64, formatted: f64) -> Self {
        Self { base, formatted }
    }

    /// The threshold a source phrase must clear
    pub fn active(&self, formatted: bool) -> f64 {
        if formatted {
            self.formatted.max(self.base)
        } else {
            self.base
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(0.3, 0.4)
    }
}

/// Output of one solver run
#[derive(Debug, Clone, Default)]
pub struct Solution {
    /// Accepted alignments ordered by source start word
    pub alignments: Vec<Alignment>,
    /// Best-scoring pairs that were not accepted
    pub rejected: Vec<RejectedMatch>,
}

/// Greedy overlap-excluding solver
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentSolver {
    thresholds: Thresholds,
}

impl AlignmentSolver {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Align source phrases to target phrases.
    ///
    /// `matrix[i][j]` is the score of source phrase `i` against target phrase `j`.
    /// `formatted[i]` raises the threshold of source phrase `i`; missing entries
    /// count as unformatted.
    pub fn solve(
        &self,
        source: &[Phrase],
        target: &[Phrase],
        matrix: &[Vec<f64>],
        formatted: &[bool],
    ) -> Solution {
        let mut pairs: Vec<(f64, usize, usize)> = Vec::with_capacity(source.len() * target.len());
        for (i, row) in matrix.iter().enumerate().take(source.len()) {
            for (j, score) in row.iter().enumerate().take(target.len()) {
                pairs.push((*score, i, j));
            }
        }

        pairs.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| source[a.1].start.cmp(&source[b.1].start))
                .then_with(|| target[a.2].start.cmp(&target[b.2].start))
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        let mut used_source: HashSet<usize> = HashSet::new();
        let mut used_target: HashSet<usize> = HashSet::new();
        let mut alignments = Vec::new();
        let mut accepted: HashSet<(usize, usize)> = HashSet::new();

        for &(score, i, j) in &pairs {
            let threshold = self.thresholds.active(formatted.get(i).copied().unwrap_or(false));
            if score < threshold {
                continue;
            }

            let src = &source[i];
            let tgt = &target[j];
            let overlaps = (src.start..=src.end).any(|w| used_source.contains(&w))
                || (tgt.start..=tgt.end).any(|w| used_target.contains(&w));
            if overlaps {
                continue;
            }

            used_source.extend(src.start..=src.end);
            used_target.extend(tgt.start..=tgt.end);
            accepted.insert((i, j));
            alignments.push(Alignment {
                source_phrase: i,
                target_phrase: j,
                score,
            });
        }

        alignments.sort_by_key(|a| source[a.source_phrase].start);

        let rejected = pairs
            .iter()
            .take(NEAR_MISS_WINDOW)
            .filter(|(score, i, j)| !accepted.contains(&(*i, *j)) && *score >= NEAR_MISS_FLOOR)
            .take(NEAR_MISS_LIMIT)
            .map(|&(score, i, j)| {
                let threshold = self.thresholds.active(formatted.get(i).copied().unwrap_or(false));
                RejectedMatch {
                    source_phrase: i,
                    target_phrase: j,
                    score,
                    reason: if score < threshold {
                        RejectionReason::BelowThreshold
                    } else {
                        RejectionReason::Overlap
                    },
                }
            })
            .collect();

        Solution {
            alignments,
            rejected,
        }
    }
}
