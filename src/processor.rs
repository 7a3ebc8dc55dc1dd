/*!
 * Stream processing for paragraph and table records.
 *
 * Records are read from line-delimited JSON, aligned by a bounded pool of
 * concurrent units, and written back in input order. A unit that fails or runs
 * out of time degrades to a fallback instead of stopping the stream.
 */

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::alignment::{
    AlignmentOutcome, AlignmentStrategy, EmbeddingAligner, EmbeddingProvider, FormattingAligner,
    HashedEmbedder, LlmAligner, PhraseMappings, Run,
};
use crate::app_config::{Config, EmbeddingBackend, ProcessingConfig};
use crate::errors::AlignmentError;
use crate::glossary::Glossary;
use crate::providers::ollama::{Ollama, OllamaEmbedder};
use crate::records::{
    AlignmentMetadata, CellDebug, DebugRecord, ParagraphRecord, TableDebugRecord, TableRecord,
};
use crate::translator::ProviderTranslator;

/// How one unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Aligned,
    /// Alignment error; source runs were written through
    Failed,
    /// Ran out of time; a fallback was written
    TimedOut,
}

/// Counters reported at the end of a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Records written to the output
    pub records: usize,
    pub aligned: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Input lines that were not valid records
    pub malformed: usize,
    pub cells_aligned: usize,
    pub cells_skipped: usize,
}

impl ProcessingSummary {
    fn record(&mut self, status: UnitStatus) {
        self.records += 1;
        match status {
            UnitStatus::Aligned => self.aligned += 1,
            UnitStatus::Failed => self.failed += 1,
            UnitStatus::TimedOut => self.timed_out += 1,
        }
    }
}

impl fmt::Display for ProcessingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records ({} aligned, {} failed, {} timed out), {} malformed lines skipped",
            self.records, self.aligned, self.failed, self.timed_out, self.malformed
        )?;
        if self.cells_aligned + self.cells_skipped > 0 {
            write!(f, ", {} cells aligned, {} cells skipped", self.cells_aligned, self.cells_skipped)?;
        }
        Ok(())
    }
}

/// One aligned paragraph and its trace
#[derive(Debug)]
pub struct ParagraphResult {
    pub record: ParagraphRecord,
    pub debug: Option<DebugRecord>,
    pub status: UnitStatus,
}

/// One table with its aligned cells and its trace
#[derive(Debug)]
pub struct TableResult {
    pub record: TableRecord,
    pub debug: Option<TableDebugRecord>,
    pub status: UnitStatus,
    pub cells_aligned: usize,
    pub cells_skipped: usize,
}

/// One input line: a typed record, or JSON that does not fit the record shape
#[derive(Debug)]
enum InputLine<T> {
    Record(T),
    Passthrough(Value),
}

/// What a worker hands back for one input line
enum Processed<R> {
    Unit(R),
    Passthrough(Value),
}

/// `<stem>_debug<.ext>` next to `output`
pub fn default_debug_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}_debug.{}", stem, ext.to_string_lossy()),
        None => format!("{}_debug", stem),
    };
    output.with_file_name(name)
}

/// Build the configured aligner
///
/// Glossary mappings are merged into the built-in phrase mappings for the
/// embedding strategy and sent as prompt context for the term-lookup strategy.
pub fn build_aligner(config: &Config, glossary: Option<Arc<Glossary>>) -> Result<Arc<dyn FormattingAligner>> {
    match config.alignment.strategy {
        AlignmentStrategy::Embedding => {
            let embedding = &config.embedding;
            let provider: Arc<dyn EmbeddingProvider> = match embedding.backend {
                EmbeddingBackend::Ollama => {
                    let client = Ollama::new_with_config(
                        embedding.endpoint.clone(),
                        config.translation.common.retry_count,
                        config.translation.common.retry_backoff_ms,
                        None,
                        embedding.timeout_secs,
                    );
                    Arc::new(OllamaEmbedder::new(client, embedding.model.clone(), embedding.concurrent_requests))
                }
                EmbeddingBackend::Hashed => Arc::new(HashedEmbedder::new(embedding.dimensions)),
            };

            let mut mappings = PhraseMappings::builtin();
            if let Some(glossary) = &glossary {
                mappings.extend(&glossary.phrase_mappings());
            }
            info!(
                "Using embedding alignment ({} backend, {} phrase mappings)",
                embedding.backend,
                mappings.len()
            );

            Ok(Arc::new(EmbeddingAligner::new(
                provider,
                Arc::new(mappings),
                config.alignment.aligner_options(),
            )))
        }
        AlignmentStrategy::Llm => {
            let (source_language, target_language) = config.language_names()?;
            let translator = ProviderTranslator::from_config(&config.translation, &source_language, &target_language)
                .context("Failed to create translator")?;
            info!(
                "Using term-lookup alignment with {} ({})",
                translator.provider().display_name(),
                translator.model()
            );

            let mut aligner = LlmAligner::new(Arc::new(translator), source_language, target_language);
            if let Some(glossary) = glossary {
                aligner = aligner.with_glossary(glossary);
            }
            Ok(Arc::new(aligner))
        }
    }
}

/// Runs an aligner over record streams
#[derive(Debug, Clone)]
pub struct AlignmentEngine {
    aligner: Arc<dyn FormattingAligner>,
    concurrent_units: usize,
    unit_timeout: Duration,
    show_progress: bool,
}

impl AlignmentEngine {
    pub fn new(aligner: Arc<dyn FormattingAligner>, processing: &ProcessingConfig) -> Self {
        Self {
            aligner,
            concurrent_units: processing.concurrent_units.max(1),
            unit_timeout: Duration::from_secs(processing.unit_timeout_secs.max(1)),
            show_progress: false,
        }
    }

    /// Build the engine from a validated configuration
    pub fn from_config(config: &Config, glossary: Option<Arc<Glossary>>) -> Result<Self> {
        Ok(Self::new(build_aligner(config, glossary)?, &config.processing))
    }

    /// Draw a progress bar on stderr while processing
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Override the per-unit timeout
    pub fn with_unit_timeout(mut self, unit_timeout: Duration) -> Self {
        self.unit_timeout = unit_timeout;
        self
    }

    pub fn strategy(&self) -> AlignmentStrategy {
        self.aligner.strategy()
    }

    async fn align_with_timeout(
        &self,
        source_text: &str,
        target_text: &str,
        runs: &[Run],
    ) -> Option<Result<AlignmentOutcome, AlignmentError>> {
        timeout(self.unit_timeout, self.aligner.align(source_text, target_text, runs))
            .await
            .ok()
    }

    fn metadata(&self, source_runs: &[Run], aligned: &[Run], source_text: &str, target_text: &str) -> AlignmentMetadata {
        let mut metadata = AlignmentMetadata::new(source_runs, aligned, source_text, target_text);
        if self.strategy() == AlignmentStrategy::Llm {
            metadata.alignment_method = Some(self.strategy().to_string());
        }
        metadata
    }

    /// Align one paragraph record
    pub async fn align_paragraph(&self, mut record: ParagraphRecord) -> ParagraphResult {
        let label = paragraph_label(&record);

        match self.align_with_timeout(&record.text, &record.translated_text, &record.runs).await {
            Some(Ok(outcome)) => {
                debug!(
                    "Paragraph {}: {} aligned runs from {} source runs",
                    label,
                    outcome.runs.len(),
                    record.runs.len()
                );
                record.alignment_metadata =
                    Some(self.metadata(&record.runs, &outcome.runs, &record.text, &record.translated_text));
                let debug = outcome.debug.map(|trace| DebugRecord::new(&record, trace));
                record.aligned_runs = Some(outcome.runs);
                ParagraphResult {
                    record,
                    debug,
                    status: UnitStatus::Aligned,
                }
            }
            Some(Err(e)) => {
                error!("Error aligning paragraph {}: {}", label, e);
                record.aligned_runs = Some(record.runs.clone());
                ParagraphResult {
                    record,
                    debug: None,
                    status: UnitStatus::Failed,
                }
            }
            None => {
                warn!(
                    "Paragraph {} timed out after {:?}, writing unformatted target text",
                    label, self.unit_timeout
                );
                record.aligned_runs = Some(vec![Run::plain(record.translated_text.clone())]);
                ParagraphResult {
                    record,
                    debug: None,
                    status: UnitStatus::TimedOut,
                }
            }
        }
    }

    /// Align every eligible paragraph of every cell of one table
    ///
    /// Cells that cannot be aligned keep their runs.
    pub async fn align_table(&self, mut table: TableRecord) -> TableResult {
        let mut cells_aligned = 0;
        let mut cells_skipped = 0;
        let mut details = Vec::new();

        for cell in &mut table.cells {
            for (paragraph_index, paragraph) in cell.paragraphs.iter_mut().enumerate() {
                let Some((runs, source_text, target_text)) = paragraph.alignable() else {
                    cells_skipped += 1;
                    continue;
                };

                match self.align_with_timeout(source_text, target_text, runs).await {
                    Some(Ok(outcome)) => {
                        let metadata = self.metadata(runs, &outcome.runs, source_text, target_text);
                        if let Some(trace) = outcome.debug {
                            details.push(CellDebug {
                                cell_position: (cell.row, cell.col),
                                paragraph_index,
                                source_text: source_text.to_string(),
                                target_text: target_text.to_string(),
                                source_runs_count: runs.len(),
                                aligned_runs_count: outcome.runs.len(),
                                alignment_debug: trace,
                            });
                        }
                        paragraph.alignment_metadata = Some(metadata);
                        paragraph.runs = Some(outcome.runs);
                        cells_aligned += 1;
                    }
                    Some(Err(e)) => {
                        error!("Error aligning cell ({}, {}): {}", cell.row, cell.col, e);
                        cells_skipped += 1;
                    }
                    None => {
                        warn!("Cell ({}, {}) timed out, keeping its runs", cell.row, cell.col);
                        cells_skipped += 1;
                    }
                }
            }
        }

        info!(
            "Aligned {} cells, skipped {} cells in table {} on slide {}",
            cells_aligned,
            cells_skipped,
            table.size_label(),
            index_label(table.slide_index)
        );

        let debug = (!details.is_empty()).then(|| TableDebugRecord {
            slide_index: table.slide_index,
            shape_index: table.shape_index,
            table_size: table.size_label(),
            cells_aligned,
            cells_skipped,
            cell_details: details,
        });

        TableResult {
            record: table,
            debug,
            status: UnitStatus::Aligned,
            cells_aligned,
            cells_skipped,
        }
    }

    /// Align a paragraph stream from `input` into `output`, traces into `debug_output`
    pub async fn process_paragraphs(&self, input: &Path, output: &Path, debug_output: &Path) -> Result<ProcessingSummary> {
        info!("Aligning paragraphs from {}", input.display());
        let mut summary = ProcessingSummary::default();
        let lines: Vec<InputLine<ParagraphRecord>> = read_records(input, &mut summary)?;
        let mut out = create_writer(output)?;
        let mut debug_out = create_writer(debug_output)?;
        let progress = self.progress_bar(lines.len() as u64, "paragraphs");

        let results = stream::iter(lines)
            .map(|line| async move {
                match line {
                    InputLine::Record(record) => Processed::Unit(self.align_paragraph(record).await),
                    InputLine::Passthrough(value) => Processed::Passthrough(with_source_runs(value)),
                }
            })
            .buffered(self.concurrent_units);
        futures::pin_mut!(results);

        while let Some(processed) = results.next().await {
            match processed {
                Processed::Unit(result) => {
                    summary.record(result.status);
                    write_line(&mut out, &result.record)?;
                    if let Some(trace) = &result.debug {
                        write_line(&mut debug_out, trace)?;
                    }
                }
                Processed::Passthrough(value) => {
                    summary.record(UnitStatus::Failed);
                    write_line(&mut out, &value)?;
                }
            }
            progress.inc(1);
        }

        out.flush().with_context(|| format!("Failed to write {}", output.display()))?;
        debug_out.flush().with_context(|| format!("Failed to write {}", debug_output.display()))?;
        progress.finish_and_clear();

        info!("Processed {} to {}", summary, output.display());
        info!("Debug alignment details written to {}", debug_output.display());
        Ok(summary)
    }

    /// Align a table stream from `input` into `output`, traces into `debug_output`
    pub async fn process_tables(&self, input: &Path, output: &Path, debug_output: &Path) -> Result<ProcessingSummary> {
        info!("Aligning tables from {}", input.display());
        let mut summary = ProcessingSummary::default();
        let lines: Vec<InputLine<TableRecord>> = read_records(input, &mut summary)?;
        let mut out = create_writer(output)?;
        let mut debug_out = create_writer(debug_output)?;
        let progress = self.progress_bar(lines.len() as u64, "tables");

        let results = stream::iter(lines)
            .map(|line| async move {
                match line {
                    InputLine::Record(table) => Processed::Unit(self.align_table(table).await),
                    InputLine::Passthrough(value) => Processed::Passthrough(value),
                }
            })
            .buffered(self.concurrent_units);
        futures::pin_mut!(results);

        while let Some(processed) = results.next().await {
            match processed {
                Processed::Unit(result) => {
                    summary.record(result.status);
                    summary.cells_aligned += result.cells_aligned;
                    summary.cells_skipped += result.cells_skipped;
                    write_line(&mut out, &result.record)?;
                    if let Some(trace) = &result.debug {
                        write_line(&mut debug_out, trace)?;
                    }
                }
                Processed::Passthrough(value) => {
                    summary.record(UnitStatus::Failed);
                    write_line(&mut out, &value)?;
                }
            }
            progress.inc(1);
        }

        out.flush().with_context(|| format!("Failed to write {}", output.display()))?;
        debug_out.flush().with_context(|| format!("Failed to write {}", debug_output.display()))?;
        progress.finish_and_clear();

        info!("Processed {} to {}", summary, output.display());
        Ok(summary)
    }

    fn progress_bar(&self, len: u64, unit: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{eta}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress
    }
}

fn index_label(index: Option<i64>) -> String {
    index.map_or_else(|| "?".to_string(), |i| i.to_string())
}

fn paragraph_label(record: &ParagraphRecord) -> String {
    format!(
        "{}/{}/{}",
        index_label(record.slide_index),
        index_label(record.shape_index),
        index_label(record.paragraph_index)
    )
}

/// Parse every non-blank line
///
/// Lines that are not JSON are logged and counted as malformed. JSON that does
/// not fit the record shape (a `null` text, a string where runs belong) is kept
/// for passthrough so the output has one record per input record.
fn read_records<T: DeserializeOwned>(input: &Path, summary: &mut ProcessingSummary) -> Result<Vec<InputLine<T>>> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let mut lines = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = match serde_json::from_str::<Value>(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Error decoding JSON at line {}: {}", index + 1, e);
                summary.malformed += 1;
                continue;
            }
        };
        match T::deserialize(&value) {
            Ok(record) => lines.push(InputLine::Record(record)),
            Err(e) => {
                warn!("Unexpected record shape at line {}, writing it through: {}", index + 1, e);
                lines.push(InputLine::Passthrough(value));
            }
        }
    }
    Ok(lines)
}

/// Copy `runs` into `aligned_runs` of a paragraph that could not be decoded
fn with_source_runs(mut value: Value) -> Value {
    if let Value::Object(fields) = &mut value {
        let runs = fields
            .get("runs")
            .filter(|runs| runs.is_array())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        fields.insert("aligned_runs".to_string(), runs);
    }
    value
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_line<T: Serialize>(writer: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *writer, value).context("Failed to serialize record")?;
    writer.write_all(b"\n").context("Failed to write record")?;
    Ok(())
}
