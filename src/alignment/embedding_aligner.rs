/*!
 * Phrase-embedding alignment strategy.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::AlignmentError;

use super::builder::{build_from_word_runs, project_alignments, shortcut, Shortcut};
use super::debug::{
    round_score, AlignmentDebug, AlignmentType, PhraseAlignmentDebug, RejectedMatchDebug,
    SourceFormattingDebug,
};
use super::embedder::{EmbeddingProvider, PhraseEmbedder, PhraseSet};
use super::run::Run;
use super::run_mapper::{formatted_phrases, map_words_to_runs, phrase_run, WordRunMap};
use super::similarity::{PhraseMappings, SimilarityScorer};
use super::solver::{AlignmentSolver, Solution};
use super::{AlignerOptions, AlignmentOutcome, AlignmentStrategy, FormattingAligner};

/// Aligns paragraphs by embedding every phrase of both texts and pairing them
/// greedily by similarity
///
/// The embedding provider and the phrase-mapping table are shared by handle, so
/// one aligner serves every worker.
#[derive(Debug, Clone)]
pub struct EmbeddingAligner {
    provider: Arc<dyn EmbeddingProvider>,
    phrases: PhraseEmbedder,
    scorer: SimilarityScorer,
    solver: AlignmentSolver,
}

impl EmbeddingAligner {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        mappings: Arc<PhraseMappings>,
        options: AlignerOptions,
    ) -> Self {
        Self {
            provider,
            phrases: PhraseEmbedder::new(options.max_phrase_length),
            scorer: SimilarityScorer::new(mappings, options.weights),
            solver: AlignmentSolver::new(options.thresholds),
        }
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    fn trace(
        &self,
        source: &PhraseSet,
        target: &PhraseSet,
        solution: &Solution,
        source_word_runs: &WordRunMap,
        runs: &[Run],
    ) -> AlignmentDebug {
        let mut trace = AlignmentDebug::of_type(AlignmentType::MultiRun);
        trace.source_words = source.words.iter().map(|w| w.content().to_string()).collect();
        trace.target_words = target.words.iter().map(|w| w.content().to_string()).collect();

        trace.phrase_alignments = solution
            .alignments
            .iter()
            .map(|alignment| {
                let src = &source.phrases[alignment.source_phrase];
                let tgt = &target.phrases[alignment.target_phrase];
                let run_index = phrase_run(src, source_word_runs);
                let run = run_index.and_then(|i| runs.get(i));
                PhraseAlignmentDebug {
                    source_phrase: src.text.clone(),
                    target_phrase: tgt.text.clone(),
                    similarity: round_score(alignment.score),
                    source_word_indices: src.word_indices(),
                    target_word_indices: tgt.word_indices(),
                    source_run_index: run_index,
                    source_formatting: SourceFormattingDebug {
                        bold: run.map(|r| r.format.bold),
                        color: run.and_then(|r| r.format.color.clone()),
                    },
                }
            })
            .collect();

        trace.rejected_matches = solution
            .rejected
            .iter()
            .map(|rejected| RejectedMatchDebug {
                source_phrase: source.phrases[rejected.source_phrase].text.clone(),
                target_phrase: target.phrases[rejected.target_phrase].text.clone(),
                similarity: round_score(rejected.score),
                reason: rejected.reason,
            })
            .collect();

        trace
    }
}

#[async_trait]
impl FormattingAligner for EmbeddingAligner {
    fn strategy(&self) -> AlignmentStrategy {
        AlignmentStrategy::Embedding
    }

    async fn align(
        &self,
        source_text: &str,
        target_text: &str,
        runs: &[Run],
    ) -> Result<AlignmentOutcome, AlignmentError> {
        match shortcut(source_text, target_text, runs) {
            Some(Shortcut::Empty(out)) => {
                debug!("Blank text or no source runs, returning a default run");
                return Ok(AlignmentOutcome::new(out, None));
            }
            Some(Shortcut::SingleRun(out)) => {
                debug!("Single source run, applying its formatting to the whole target");
                return Ok(AlignmentOutcome::new(
                    out,
                    Some(AlignmentDebug::of_type(AlignmentType::SingleRun)),
                ));
            }
            None => {}
        }

        let source = self.phrases.embed(source_text, self.provider.as_ref()).await?;
        let target = self.phrases.embed(target_text, self.provider.as_ref()).await?;

        // CPU-bound from here on; run it on the blocking pool
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));
        let worker = self.clone();
        let target_text = target_text.to_string();
        let runs = runs.to_vec();

        tokio::task::spawn_blocking(move || worker.align_phrases(&source, &target, &target_text, &runs, &cancelled))
            .await
            .map_err(|e| AlignmentError::Worker(e.to_string()))?
            .ok_or_else(|| AlignmentError::Worker("alignment cancelled".to_string()))
    }
}

/// Raises its flag when dropped, telling a blocking scorer its caller is gone
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl EmbeddingAligner {
    /// Score, solve and rebuild runs for two embedded texts
    ///
    /// Returns `None` when `cancelled` was raised before scoring finished.
    fn align_phrases(
        &self,
        source: &PhraseSet,
        target: &PhraseSet,
        target_text: &str,
        runs: &[Run],
        cancelled: &AtomicBool,
    ) -> Option<AlignmentOutcome> {
        let source_word_runs = map_words_to_runs(&source.words, runs);
        let formatted = formatted_phrases(&source.phrases, &source_word_runs, runs);
        let matrix = self.scorer.matrix_until(source, target, cancelled)?;
        let solution = self
            .solver
            .solve(&source.phrases, &target.phrases, &matrix, &formatted);

        debug!(
            "Aligned {} of {} source phrases against {} target phrases",
            solution.alignments.len(),
            source.phrases.len(),
            target.phrases.len()
        );

        let target_word_runs = project_alignments(
            &solution.alignments,
            &source.phrases,
            &target.phrases,
            &source_word_runs,
            target.words.len(),
        );
        let aligned = build_from_word_runs(target_text, &target.words, &target_word_runs, runs);
        let trace = self.trace(source, target, &solution, &source_word_runs, runs);

        Some(AlignmentOutcome::new(aligned, Some(trace)))
    }
}
