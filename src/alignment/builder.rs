/*!
 * Target run construction.
 *
 * Both strategies end here. The embedding strategy hands over a target word to
 * source run map; the term strategy hands over byte-span mappings. Either way the
 * output runs concatenate to exactly the target text.
 */

use super::embedder::Phrase;
use super::run::{baseline_run_index, merge_identical_runs, Run, RunFormat};
use super::run_mapper::{phrase_run, WordRunMap};
use super::solver::Alignment;
use super::tokenizer::Word;

/// A located term: a byte span of the target text that takes a given format
#[derive(Debug, Clone, PartialEq)]
pub struct SpanMapping {
    /// Source term the span was located for
    pub term: String,
    /// Byte offset of the first character in the target text
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    pub format: RunFormat,
}

/// Result of the shortcut checks done before any alignment work
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    /// Blank source or target text, or no source runs
    Empty(Vec<Run>),
    /// Exactly one source run
    SingleRun(Vec<Run>),
}

impl Shortcut {
    pub fn into_runs(self) -> Vec<Run> {
        match self {
            Shortcut::Empty(runs) | Shortcut::SingleRun(runs) => runs,
        }
    }
}

/// Check the cases that need no alignment.
///
/// Blank text on either side or no source runs give one default-formatted run;
/// a single source run gives one run with its format over the whole target text.
pub fn shortcut(source_text: &str, target_text: &str, runs: &[Run]) -> Option<Shortcut> {
    if source_text.trim().is_empty() || target_text.trim().is_empty() || runs.is_empty() {
        return Some(Shortcut::Empty(vec![Run::plain(target_text)]));
    }
    if let [only] = runs {
        return Some(Shortcut::SingleRun(vec![Run::new(target_text, only.effective_format())]));
    }
    None
}

/// Project accepted alignments onto target words.
///
/// Each alignment takes the run of the first mapped source word in its phrase;
/// every target word it covers that is not yet mapped receives that run.
pub fn project_alignments(
    alignments: &[Alignment],
    source_phrases: &[Phrase],
    target_phrases: &[Phrase],
    source_word_runs: &WordRunMap,
    target_word_count: usize,
) -> WordRunMap {
    let mut target_word_runs: WordRunMap = vec![None; target_word_count];

    for alignment in alignments {
        let Some(run_idx) = phrase_run(&source_phrases[alignment.source_phrase], source_word_runs) else {
            continue;
        };
        let target = &target_phrases[alignment.target_phrase];
        for slot in target_word_runs
            .iter_mut()
            .take(target.end + 1)
            .skip(target.start)
        {
            if slot.is_none() {
                *slot = Some(run_idx);
            }
        }
    }

    target_word_runs
}

/// Build target runs from a target word to source run map.
///
/// Unmapped words take the baseline run. A new run opens wherever the resolved
/// source run changes; identical neighbours are merged afterwards.
pub fn build_from_word_runs(
    target_text: &str,
    target_words: &[Word],
    target_word_runs: &WordRunMap,
    source_runs: &[Run],
) -> Vec<Run> {
    if target_words.is_empty() {
        return vec![Run::plain(target_text)];
    }

    let baseline = baseline_run_index(source_runs);
    let format_of = |idx: Option<usize>| -> RunFormat {
        idx.and_then(|i| source_runs.get(i))
            .map(Run::effective_format)
            .unwrap_or_default()
    };

    let mut runs = Vec::new();
    let mut group_start = 0;
    let mut current = resolve(target_word_runs, 0, baseline, source_runs.len());

    for idx in 1..target_words.len() {
        let resolved = resolve(target_word_runs, idx, baseline, source_runs.len());
        if resolved != current {
            let text = &target_text[target_words[group_start].start..target_words[idx - 1].end];
            runs.push(Run::new(text, format_of(current)));
            group_start = idx;
            current = resolved;
        }
    }

    let last = target_words.len() - 1;
    let text = &target_text[target_words[group_start].start..target_words[last].end];
    runs.push(Run::new(text, format_of(current)));

    merge_identical_runs(runs)
}

fn resolve(map: &WordRunMap, word: usize, baseline: Option<usize>, run_count: usize) -> Option<usize> {
    map.get(word)
        .copied()
        .flatten()
        .filter(|r| *r < run_count)
        .or(baseline)
}

/// Build target runs from located term spans.
///
/// Spans are taken in start order; a span overlapping an earlier one is ignored.
/// Gaps between spans take `gap_format`.
pub fn build_from_spans(target_text: &str, mappings: &[SpanMapping], gap_format: &RunFormat) -> Vec<Run> {
    let mut sorted: Vec<&SpanMapping> = mappings
        .iter()
        .filter(|m| m.start < m.end && m.end <= target_text.len())
        .filter(|m| target_text.is_char_boundary(m.start) && target_text.is_char_boundary(m.end))
        .collect();
    sorted.sort_by_key(|m| (m.start, m.end));

    let mut runs = Vec::new();
    let mut cursor = 0;
    for mapping in sorted {
        if mapping.start < cursor {
            continue;
        }
        if mapping.start > cursor {
            runs.push(Run::new(&target_text[cursor..mapping.start], gap_format.clone()));
        }
        runs.push(Run::new(&target_text[mapping.start..mapping.end], mapping.format.clone()));
        cursor = mapping.end;
    }
    if cursor < target_text.len() || runs.is_empty() {
        runs.push(Run::new(&target_text[cursor..], gap_format.clone()));
    }

    merge_identical_runs(runs)
}
