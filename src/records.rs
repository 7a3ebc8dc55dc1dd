/*!
 * Line-delimited JSON records exchanged with the extraction and writing stages.
 *
 * Every record keeps the fields it does not know about, so a paragraph written
 * back out carries everything the extractor put in.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::alignment::{AlignmentDebug, Run};

/// One translated paragraph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphRecord {
    #[serde(default)]
    pub slide_index: Option<i64>,
    #[serde(default)]
    pub shape_index: Option<i64>,
    #[serde(default)]
    pub paragraph_index: Option<i64>,
    /// Source paragraph text
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub translated_text: String,
    /// Source runs
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aligned_runs: Option<Vec<Run>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_metadata: Option<AlignmentMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Summary attached to every aligned paragraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentMetadata {
    /// Set for the term-lookup strategy only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_method: Option<String>,
    pub source_runs_count: usize,
    pub aligned_runs_count: usize,
    pub source_text: String,
    pub target_text: String,
}

impl AlignmentMetadata {
    pub fn new(source_runs: &[Run], aligned_runs: &[Run], source_text: &str, target_text: &str) -> Self {
        Self {
            alignment_method: None,
            source_runs_count: source_runs.len(),
            aligned_runs_count: aligned_runs.len(),
            source_text: source_text.to_string(),
            target_text: target_text.to_string(),
        }
    }
}

/// Per-paragraph alignment trace written to the debug stream
#[derive(Debug, Clone, Serialize)]
pub struct DebugRecord {
    pub slide_index: Option<i64>,
    pub shape_index: Option<i64>,
    pub paragraph_index: Option<i64>,
    pub source_text: String,
    pub target_text: String,
    pub source_runs: Vec<Run>,
    pub alignment_debug: AlignmentDebug,
}

impl DebugRecord {
    pub fn new(record: &ParagraphRecord, alignment_debug: AlignmentDebug) -> Self {
        Self {
            slide_index: record.slide_index,
            shape_index: record.shape_index,
            paragraph_index: record.paragraph_index,
            source_text: record.text.clone(),
            target_text: record.translated_text.clone(),
            source_runs: record.runs.clone(),
            alignment_debug,
        }
    }
}

/// A translated table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    #[serde(default)]
    pub slide_index: Option<i64>,
    #[serde(default)]
    pub shape_index: Option<i64>,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub cols: Option<usize>,
    #[serde(default)]
    pub cells: Vec<TableCell>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableRecord {
    /// `"<rows>x<cols>"`, with `?` for unknown dimensions
    pub fn size_label(&self) -> String {
        let dim = |d: Option<usize>| d.map_or_else(|| "?".to_string(), |d| d.to_string());
        format!("{}x{}", dim(self.rows), dim(self.cols))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub col: usize,
    #[serde(default)]
    pub paragraphs: Vec<CellParagraph>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A paragraph inside a table cell
///
/// The writer stage reads `runs`; the source formatting travels in
/// `original_runs` next to both texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellParagraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_runs: Option<Vec<Run>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<Vec<Run>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_metadata: Option<AlignmentMetadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CellParagraph {
    /// Source runs and both texts, when all are present and non-blank
    pub fn alignable(&self) -> Option<(&[Run], &str, &str)> {
        let runs = self.original_runs.as_deref().filter(|r| !r.is_empty())?;
        let source = self.original_text.as_deref().filter(|t| !t.trim().is_empty())?;
        let target = self.translated_text.as_deref().filter(|t| !t.trim().is_empty())?;
        Some((runs, source, target))
    }
}

/// Trace for one aligned cell paragraph
#[derive(Debug, Clone, Serialize)]
pub struct CellDebug {
    pub cell_position: (usize, usize),
    pub paragraph_index: usize,
    pub source_text: String,
    pub target_text: String,
    pub source_runs_count: usize,
    pub aligned_runs_count: usize,
    pub alignment_debug: AlignmentDebug,
}

/// Per-table summary written to the debug stream
#[derive(Debug, Clone, Serialize)]
pub struct TableDebugRecord {
    pub slide_index: Option<i64>,
    pub shape_index: Option<i64>,
    pub table_size: String,
    pub cells_aligned: usize,
    pub cells_skipped: usize,
    pub cell_details: Vec<CellDebug>,
}
