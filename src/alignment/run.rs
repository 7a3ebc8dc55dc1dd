/*!
 * Formatting runs.
 *
 * A run is a span of paragraph text that shares one formatting tuple. Source runs
 * come in from the extraction layer and are never modified; target runs are
 * synthesized by the builders in this crate.
 */

use serde::{Deserialize, Serialize};

/// Color prefix used by presentation themes for background colors
const BACKGROUND_THEME_PREFIX: &str = "theme:BACKGROUND";

/// The formatting tuple carried by a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFormat {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub superscript: bool,
    #[serde(default)]
    pub subscript: bool,
    #[serde(default)]
    pub hyperlink: Option<String>,
}

impl RunFormat {
    /// Whether the run carries a color that reads as emphasis.
    ///
    /// Background theme colors and plain white are treated as default text color.
    pub fn has_emphasis_color(&self) -> bool {
        match self.color.as_deref() {
            Some(color) if !color.is_empty() => {
                !color.starts_with(BACKGROUND_THEME_PREFIX) && !color.eq_ignore_ascii_case("#FFFFFF")
            }
            _ => false,
        }
    }

    /// Bold or emphasis color: the formats that raise the alignment threshold
    pub fn is_formatted(&self) -> bool {
        self.bold || self.has_emphasis_color()
    }

    /// Character-level emphasis, not counting font/size deltas or hyperlinks
    pub fn has_character_emphasis(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.superscript
            || self.subscript
            || self.has_emphasis_color()
    }
}

/// A formatted span of paragraph text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub text: String,

    #[serde(flatten)]
    pub format: RunFormat,

    /// Legacy hyperlink field written by older extractors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Run {
    /// Create a run with the given text and formatting
    pub fn new(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
            url: None,
        }
    }

    /// Create a run with all-default formatting
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunFormat::default())
    }

    /// The formatting to copy onto target text.
    ///
    /// The hyperlink falls back to the legacy `url` field.
    pub fn effective_format(&self) -> RunFormat {
        let mut format = self.format.clone();
        if format.hyperlink.is_none() {
            format.hyperlink = self.url.clone();
        }
        format
    }

    /// Length in characters, used when picking the baseline run
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Concatenate the text of all runs
pub fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Index of the run whose formatting fills unaligned target words.
///
/// The longest non-bold run wins; if every run is bold, the longest run overall.
/// Ties keep the earliest run. Returns `None` for an empty slice.
pub fn baseline_run_index(runs: &[Run]) -> Option<usize> {
    longest_run(runs.iter().enumerate().filter(|(_, r)| !r.format.bold))
        .or_else(|| longest_run(runs.iter().enumerate()))
}

/// Index of the longest run among the candidates, earliest on ties
pub(crate) fn longest_run<'a>(candidates: impl Iterator<Item = (usize, &'a Run)>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, run) in candidates {
        let len = run.char_len();
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((idx, len));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Merge adjacent runs whose formatting tuples are identical.
///
/// Idempotent: merging an already merged sequence returns it unchanged.
pub fn merge_identical_runs(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.effective_format() == run.effective_format() => {
                last.text.push_str(&run.text);
            }
            _ => merged.push(run),
        }
    }
    merged
}
