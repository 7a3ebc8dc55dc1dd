/*!
 * Per-term lookup alignment strategy.
 *
 * Runs that stand out from the paragraph (character emphasis, a different font or
 * size, a hyperlink) become terms. For each term the translator is asked which
 * words of the existing translation correspond to it, and the answer is located in
 * the target text. Located spans take the term's format; everything else takes the
 * paragraph's base format.
 */

use async_trait::async_trait;
use log::{debug, warn};
use regex::RegexBuilder;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::AlignmentError;
use crate::glossary::Glossary;
use crate::translator::Translator;

use super::builder::{build_from_spans, shortcut, Shortcut, SpanMapping};
use super::debug::{AlignmentDebug, AlignmentType, TermMappingDebug};
use super::run::{Run, RunFormat};
use super::{AlignmentOutcome, AlignmentStrategy, FormattingAligner};

/// Quote characters stripped from translator answers
const QUOTE_CHARS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00AB}', '\u{00BB}'];

/// A run, or several adjacent runs, that needs its formatting carried over
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialTerm {
    pub text: String,
    pub format: RunFormat,
    /// Index of the first source run merged into the term
    pub first_run: usize,
    /// Index of the last source run merged into the term
    pub last_run: usize,
}

/// Most common non-empty font, first seen on ties
pub fn baseline_font(runs: &[Run]) -> Option<String> {
    most_common(runs.iter().filter_map(|r| r.format.font.clone()).filter(|f| !f.is_empty()))
}

/// Most common non-zero size, first seen on ties
pub fn baseline_size(runs: &[Run]) -> Option<f64> {
    most_common(runs.iter().filter_map(|r| r.format.size).filter(|s| *s != 0.0))
}

fn most_common<T: PartialEq>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Whether a run stands out against the paragraph baseline
fn is_special(run: &Run, font: Option<&str>, size: Option<f64>) -> bool {
    let format = run.effective_format();

    let size_differs = matches!((size, format.size), (Some(base), Some(own)) if own != 0.0 && own != base);
    let font_differs = matches!(
        (font, format.font.as_deref()),
        (Some(base), Some(own)) if !own.is_empty() && own != base
    );

    format.has_character_emphasis() || size_differs || font_differs || format.hyperlink.is_some()
}

/// Extract the special terms of a paragraph.
///
/// Whitespace-only runs never form a term. Special runs merge only when their
/// source indices are consecutive and their formats identical.
pub fn extract_special_terms(runs: &[Run]) -> Vec<SpecialTerm> {
    let font = baseline_font(runs);
    let size = baseline_size(runs);

    let mut terms: Vec<SpecialTerm> = Vec::new();
    for (idx, run) in runs.iter().enumerate() {
        if !is_special(run, font.as_deref(), size) || run.text.trim().is_empty() {
            continue;
        }
        let format = run.effective_format();

        match terms.last_mut() {
            Some(last) if last.last_run + 1 == idx && last.format == format => {
                last.text.push_str(&run.text);
                last.last_run = idx;
            }
            _ => terms.push(SpecialTerm {
                text: run.text.clone(),
                format,
                first_run: idx,
                last_run: idx,
            }),
        }
    }

    debug!(
        "Extracted {} special terms from {} runs (baseline font={:?}, size={:?})",
        terms.len(),
        runs.len(),
        font,
        size
    );
    terms
}

/// Format used for target text outside located terms.
///
/// Taken from the longest run without bold, italic, underline or emphasis color
/// (the first run if every run has one). Only font, size and color are kept.
pub fn base_format(runs: &[Run]) -> RunFormat {
    let plain = super::run::longest_run(runs.iter().enumerate().filter(|(_, r)| {
        !(r.format.bold || r.format.italic || r.format.underline || r.format.has_emphasis_color())
    }));

    match plain.or(if runs.is_empty() { None } else { Some(0) }) {
        Some(idx) => {
            let run = &runs[idx];
            RunFormat {
                font: run.format.font.clone(),
                size: run.format.size,
                color: run.format.color.clone(),
                ..Default::default()
            }
        }
        None => RunFormat::default(),
    }
}

/// Prompt asking the translator to find a term inside an existing translation
pub fn term_prompt(
    term: &str,
    source_text: &str,
    target_text: &str,
    source_language: &str,
    target_language: &str,
) -> String {
    format!(
        "Given this translation:\n\n\
         {source_language}: \"{source_text}\"\n\
         {target_language}: \"{target_text}\"\n\n\
         Find where \"{term}\" appears in the {target_language} translation above.\n\n\
         IMPORTANT:\n\
         - Return the EXACT {target_language} text that corresponds to \"{term}\"\n\
         - Copy it EXACTLY as it appears in the {target_language} sentence (with correct capitalization, accents, articles)\n\
         - Do NOT translate it yourself - just find and return what's already in the {target_language} text\n\
         - Return ONLY the {target_language} phrase (no explanation, no quotes, no extra words)\n\n\
         {target_language} equivalent:"
    )
}

/// Clean a translator answer.
///
/// Trims whitespace and surrounding quotes, and drops a trailing period the term
/// itself does not have. Returns `None` when nothing is left.
pub fn clean_response(response: &str, term: &str) -> Option<String> {
    let mut cleaned = response.trim().trim_matches(QUOTE_CHARS).trim();
    if cleaned.ends_with('.') && !term.trim_end().ends_with('.') {
        cleaned = cleaned.trim_end_matches('.').trim_end().trim_matches(QUOTE_CHARS).trim();
    }
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn overlaps_claimed(start: usize, end: usize, claimed: &[(usize, usize)]) -> bool {
    claimed.iter().any(|&(s, e)| start < e && s < end)
}

/// Locate `needle` in `haystack`, avoiding claimed byte ranges.
///
/// Tries, in order: the first case-insensitive occurrence, every case-insensitive
/// whole-word match, then every case-insensitive occurrence including overlapping
/// ones. Returns the byte span of the first unclaimed hit.
pub fn locate(needle: &str, haystack: &str, claimed: &[(usize, usize)]) -> Option<(usize, usize)> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    let escaped = regex::escape(needle);

    let substring = RegexBuilder::new(&escaped).case_insensitive(true).build().ok()?;

    if let Some(m) = substring.find(haystack) {
        if !overlaps_claimed(m.start(), m.end(), claimed) {
            return Some((m.start(), m.end()));
        }
    }

    if let Ok(word) = RegexBuilder::new(&format!(r"\b{}\b", escaped))
        .case_insensitive(true)
        .build()
    {
        if let Some(m) = word
            .find_iter(haystack)
            .find(|m| !overlaps_claimed(m.start(), m.end(), claimed))
        {
            return Some((m.start(), m.end()));
        }
    }

    let mut pos = 0;
    while pos <= haystack.len() {
        let m = substring.find_at(haystack, pos)?;
        if !overlaps_claimed(m.start(), m.end(), claimed) {
            return Some((m.start(), m.end()));
        }
        // Step one character past the previous start to allow overlapping hits
        pos = m.start() + haystack[m.start()..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Glossary entries listed per lookup prompt
const GLOSSARY_CONTEXT_ENTRIES: usize = 50;

/// Aligns paragraphs by asking a translator to find each formatted term
#[derive(Debug, Clone)]
pub struct LlmAligner {
    translator: Arc<dyn Translator>,
    source_language: String,
    target_language: String,
    glossary: Option<Arc<Glossary>>,
}

impl LlmAligner {
    /// Create an aligner; languages are display names used in the prompt
    pub fn new(
        translator: Arc<dyn Translator>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            source_language: source_language.into(),
            target_language: target_language.into(),
            glossary: None,
        }
    }

    /// Send the glossary entries relevant to each paragraph along with the lookups
    pub fn with_glossary(mut self, glossary: Arc<Glossary>) -> Self {
        self.glossary = Some(glossary);
        self
    }

    async fn lookup(&self, term: &str, source_text: &str, target_text: &str, context: Option<&str>) -> Option<String> {
        let prompt = term_prompt(term, source_text, target_text, &self.source_language, &self.target_language);
        match self.translator.translate(&prompt, context).await {
            Ok(answer) => {
                let cleaned = clean_response(&answer, term);
                if cleaned.is_none() {
                    warn!("Empty answer for term '{}'", term);
                }
                cleaned
            }
            Err(e) => {
                warn!("Term lookup failed for '{}': {}", term, AlignmentError::Translator(e));
                None
            }
        }
    }
}

#[async_trait]
impl FormattingAligner for LlmAligner {
    fn strategy(&self) -> AlignmentStrategy {
        AlignmentStrategy::Llm
    }

    async fn align(
        &self,
        source_text: &str,
        target_text: &str,
        runs: &[Run],
    ) -> Result<AlignmentOutcome, AlignmentError> {
        match shortcut(source_text, target_text, runs) {
            Some(Shortcut::Empty(out)) => return Ok(AlignmentOutcome::new(out, None)),
            Some(Shortcut::SingleRun(out)) => {
                return Ok(AlignmentOutcome::new(
                    out,
                    Some(AlignmentDebug::of_type(AlignmentType::SingleRun)),
                ));
            }
            None => {}
        }

        let gap_format = base_format(runs);
        let terms = extract_special_terms(runs);
        if terms.is_empty() {
            return Ok(AlignmentOutcome::new(
                vec![Run::new(target_text, gap_format)],
                Some(AlignmentDebug::of_type(AlignmentType::NoFormatting)),
            ));
        }

        let mut mappings: Vec<SpanMapping> = Vec::new();
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut answers = BTreeMap::new();
        let context = self
            .glossary
            .as_ref()
            .and_then(|g| g.prompt_context(source_text, GLOSSARY_CONTEXT_ENTRIES));

        for (n, term) in terms.iter().enumerate() {
            let source_term = term.text.trim();
            debug!("[{}/{}] Looking up '{}'", n + 1, terms.len(), source_term);

            let Some(answer) = self.lookup(source_term, source_text, target_text, context.as_deref()).await else {
                continue;
            };

            match locate(&answer, target_text, &claimed) {
                Some((start, end)) => {
                    debug!("Mapped '{}' to '{}' at {}..{}", source_term, &target_text[start..end], start, end);
                    claimed.push((start, end));
                    mappings.push(SpanMapping {
                        term: source_term.to_string(),
                        start,
                        end,
                        format: term.format.clone(),
                    });
                    answers.insert(source_term.to_string(), answer);
                }
                None => warn!("Could not find '{}' in target text for term '{}'", answer, source_term),
            }
        }

        let aligned = build_from_spans(target_text, &mappings, &gap_format);

        let mut trace = AlignmentDebug::of_type(AlignmentType::LlmIndividual);
        trace.term_mapping = Some(TermMappingDebug {
            formatted_runs_count: terms.len(),
            successful_mappings: mappings.len(),
            failed_mappings: terms.len() - mappings.len(),
            individual_mappings: answers,
        });

        debug!(
            "Term lookup complete: {}/{} terms mapped, {} runs created",
            mappings.len(),
            terms.len(),
            aligned.len()
        );

        Ok(AlignmentOutcome::new(aligned, Some(trace)))
    }
}
