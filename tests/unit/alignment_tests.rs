/*!
 * Tests for the alignment building blocks: tokenizer, scorer, solver and run builders
 */

use std::sync::Arc;

use runalign::alignment::builder::{build_from_spans, build_from_word_runs, SpanMapping};
use runalign::alignment::embedder::enumerate_phrases;
use runalign::alignment::run::{merge_identical_runs, runs_text};
use runalign::alignment::run_mapper::{formatted_phrases, map_words_to_runs};
use runalign::alignment::similarity::{char_jaccard, cosine_similarity, length_ratio, EXACT_MATCH_BONUS, MAPPING_BONUS};
use runalign::alignment::tokenizer::tokenize;
use runalign::alignment::{AlignmentSolver, Phrase, PhraseMappings, ScoringWeights, SimilarityScorer, Thresholds};
use runalign::{Run, RunFormat};

use crate::common::bold;

fn phrase(text: &str, start: usize, end: usize) -> Phrase {
    Phrase {
        text: text.to_string(),
        start,
        end,
    }
}

#[test]
fn test_tokenize_withMixedWhitespace_shouldReproduceInput() {
    let text = "Hello,  world\tand\nmore ";
    let words = tokenize(text);

    let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello,  ", "world\t", "and\n", "more "]);
    assert_eq!(words.iter().map(|w| w.text.as_str()).collect::<String>(), text);
    assert_eq!(words[1].content(), "world");
}

#[test]
fn test_tokenize_withLeadingWhitespace_shouldEmitBlankToken() {
    let words = tokenize("  lead");
    assert_eq!(words.len(), 2);
    assert!(words[0].is_blank());
    assert_eq!((words[1].start, words[1].end), (2, 6));
    assert!(tokenize("").is_empty());
}

#[test]
fn test_enumeratePhrases_shouldListSinglesThenWindows() {
    let words = tokenize("a b c");
    let texts: Vec<_> = enumerate_phrases(&words, 2).into_iter().map(|p| p.text).collect();
    assert_eq!(texts, vec!["a", "b", "c", "a b", "b c"]);
}

#[test]
fn test_similarityHelpers_shouldMatchDefinitions() {
    assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-9);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);

    assert_eq!(length_ratio("a b", "a b c d"), 0.5);
    assert_eq!(length_ratio("", ""), 0.0);

    assert_eq!(char_jaccard("abc", "ABD"), 0.5);
    assert_eq!(char_jaccard("", "abc"), 0.0);
}

#[test]
fn test_semanticBonus_shouldPreferExactOverMapping() {
    let mut mappings = PhraseMappings::empty();
    mappings.insert("Senate", "Sénat");
    let scorer = SimilarityScorer::new(Arc::new(mappings), ScoringWeights::default());

    assert_eq!(scorer.semantic_bonus("Ottawa", "ottawa"), EXACT_MATCH_BONUS);
    assert_eq!(scorer.semantic_bonus("senate", "SÉNAT"), MAPPING_BONUS);
    assert_eq!(scorer.semantic_bonus("senate", "chambre"), 0.0);
}

#[test]
fn test_builtinMappings_shouldContainSeedPairs() {
    let mappings = PhraseMappings::builtin();
    assert!(mappings.contains_pair("disability", "handicap"));
    assert!(mappings.contains_pair("invisible disability", "handicap invisible"));
    assert!(!mappings.is_empty());
}

#[test]
fn test_solver_withClearDiagonal_shouldPairInSourceOrder() {
    let source = vec![phrase("a", 0, 0), phrase("b", 1, 1)];
    let target = vec![phrase("x", 0, 0), phrase("y", 1, 1)];
    let matrix = vec![vec![0.2, 0.8], vec![0.9, 0.1]];

    let solution = AlignmentSolver::new(Thresholds::default()).solve(&source, &target, &matrix, &[false, false]);
    let pairs: Vec<_> = solution
        .alignments
        .iter()
        .map(|a| (a.source_phrase, a.target_phrase))
        .collect();
    assert_eq!(pairs, vec![(0, 1), (1, 0)]);
}

#[test]
fn test_solver_withFormattedPhrase_shouldApplyRaisedThreshold() {
    let source = vec![phrase("Senate", 0, 0)];
    let target = vec![phrase("Sénat", 0, 0)];
    let matrix = vec![vec![0.35]];
    let solver = AlignmentSolver::new(Thresholds::new(0.3, 0.4));

    assert!(solver.solve(&source, &target, &matrix, &[true]).alignments.is_empty());
    assert_eq!(solver.solve(&source, &target, &matrix, &[false]).alignments.len(), 1);
}

#[test]
fn test_solver_withOverlappingPhrases_shouldKeepBestOnly() {
    let source = vec![phrase("a", 0, 0), phrase("a b", 0, 1)];
    let target = vec![phrase("x", 0, 0), phrase("x y", 0, 1)];
    let matrix = vec![vec![0.5, 0.4], vec![0.3, 0.9]];

    let solution = AlignmentSolver::default().solve(&source, &target, &matrix, &[]);
    assert_eq!(solution.alignments.len(), 1);
    assert_eq!(solution.alignments[0].source_phrase, 1);
    assert_eq!(solution.alignments[0].score, 0.9);
}

#[test]
fn test_thresholds_active_shouldNeverDropBelowBase() {
    let thresholds = Thresholds::new(0.5, 0.4);
    assert_eq!(thresholds.active(true), 0.5);
    assert_eq!(thresholds.active(false), 0.5);
}

#[test]
fn test_mapWordsToRuns_shouldUseFirstOverlappingRun() {
    let runs = vec![Run::plain("The "), bold("Senate"), Run::plain(" sits")];
    let words = tokenize("The Senate sits");
    let map = map_words_to_runs(&words, &runs);
    assert_eq!(map, vec![Some(0), Some(1), Some(2)]);

    let phrases = enumerate_phrases(&words, 1);
    assert_eq!(formatted_phrases(&phrases, &map, &runs), vec![false, true, false]);
}

#[test]
fn test_buildFromWordRuns_shouldReproduceTargetText() {
    let source = vec![Run::plain("The "), bold("Senate"), Run::plain(" sits today")];
    let target = "Aujourd'hui le Sénat siège";
    let words = tokenize(target);
    let map = vec![None, None, Some(1), None];

    let runs = build_from_word_runs(target, &words, &map, &source);
    assert_eq!(runs_text(&runs), target);
    assert_eq!(
        runs,
        vec![Run::plain("Aujourd'hui le "), bold("Sénat "), Run::plain("siège")]
    );
}

#[test]
fn test_buildFromSpans_shouldSkipOverlapsAndFillGaps() {
    let target = "Le Sénat vote";
    let italic = RunFormat { italic: true, ..Default::default() };
    let mappings = vec![
        SpanMapping {
            term: "Senate".into(),
            start: 3,
            end: 9,
            format: RunFormat { bold: true, ..Default::default() },
        },
        SpanMapping {
            term: "nat".into(),
            start: 6,
            end: 9,
            format: italic,
        },
    ];

    let runs = build_from_spans(target, &mappings, &RunFormat::default());
    assert_eq!(runs, vec![Run::plain("Le "), bold("Sénat"), Run::plain(" vote")]);
}

#[test]
fn test_buildFromSpans_withNoSpans_shouldReturnSingleGapRun() {
    let runs = build_from_spans("Bonjour", &[], &RunFormat::default());
    assert_eq!(runs, vec![Run::plain("Bonjour")]);
}

#[test]
fn test_mergeIdenticalRuns_shouldTreatLegacyUrlAsHyperlink() {
    let mut legacy = Run::plain("see ");
    legacy.url = Some("https://example.com".into());
    let modern = Run::new(
        "here",
        RunFormat {
            hyperlink: Some("https://example.com".into()),
            ..Default::default()
        },
    );

    let merged = merge_identical_runs(vec![legacy, modern]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].text, "see here");
}
