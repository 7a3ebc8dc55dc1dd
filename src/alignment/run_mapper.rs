/*!
 * Source word to source run mapping.
 */

use super::embedder::Phrase;
use super::run::Run;
use super::tokenizer::Word;

/// For each source word, the index of the first run overlapping its byte span
pub type WordRunMap = Vec<Option<usize>>;

/// Map each word to the run that covers it.
///
/// Run `i` starts where run `i - 1` ended. A word span includes its trailing
/// whitespace, so a word straddling a run boundary maps to the earlier run.
pub fn map_words_to_runs(words: &[Word], runs: &[Run]) -> WordRunMap {
    let mut run_spans = Vec::with_capacity(runs.len());
    let mut pos = 0;
    for run in runs {
        let end = pos + run.text.len();
        run_spans.push((pos, end));
        pos = end;
    }

    words
        .iter()
        .map(|word| {
            run_spans
                .iter()
                .position(|&(start, end)| word.start < end && word.end > start)
        })
        .collect()
}

/// Whether each phrase touches a word whose run is bold or colored
pub fn formatted_phrases(phrases: &[Phrase], word_runs: &WordRunMap, runs: &[Run]) -> Vec<bool> {
    phrases
        .iter()
        .map(|phrase| {
            (phrase.start..=phrase.end).any(|w| {
                word_runs
                    .get(w)
                    .copied()
                    .flatten()
                    .and_then(|r| runs.get(r))
                    .is_some_and(|run| run.format.is_formatted())
            })
        })
        .collect()
}

/// Run of the first mapped word of a phrase
pub fn phrase_run(phrase: &Phrase, word_runs: &WordRunMap) -> Option<usize> {
    (phrase.start..=phrase.end).find_map(|w| word_runs.get(w).copied().flatten())
}
