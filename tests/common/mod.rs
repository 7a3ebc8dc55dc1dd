/*!
 * Common test utilities for the runalign test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use runalign::alignment::{AlignerOptions, EmbeddingAligner, EmbeddingProvider, PhraseMappings};
use runalign::app_config::ProcessingConfig;
use runalign::{AlignmentEngine, ProviderError, Run, RunFormat};

/// Routes library logs to the test output; `RUST_LOG=debug` shows traces
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Reads a line-delimited JSON file into values
pub fn read_jsonl(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| Ok(serde_json::from_str(l)?))
        .collect()
}

/// Embedding provider whose vectors carry no signal, leaving scores to the
/// lexical components
#[derive(Debug)]
pub struct ZeroEmbedder;

#[async_trait]
impl EmbeddingProvider for ZeroEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(vec![0.0; 8])
    }
}

pub fn bold(text: &str) -> Run {
    Run::new(text, RunFormat { bold: true, ..Default::default() })
}

pub fn italic(text: &str) -> Run {
    Run::new(text, RunFormat { italic: true, ..Default::default() })
}

/// Embedding aligner over the built-in mappings plus `extra` pairs
pub fn embedding_aligner(provider: Arc<dyn EmbeddingProvider>, extra: &[(&str, &str)]) -> EmbeddingAligner {
    let mut mappings = PhraseMappings::builtin();
    for (source, target) in extra {
        mappings.insert(source, target);
    }
    EmbeddingAligner::new(provider, Arc::new(mappings), AlignerOptions::default())
}

/// Engine with two workers around `aligner`
pub fn engine(aligner: Arc<dyn runalign::FormattingAligner>) -> AlignmentEngine {
    let processing = ProcessingConfig {
        concurrent_units: 2,
        unit_timeout_secs: 30,
    };
    AlignmentEngine::new(aligner, &processing)
}

/// One paragraph record as a JSON line
pub fn paragraph_line(index: i64, text: &str, translated: &str, runs: &[Run]) -> String {
    serde_json::json!({
        "slide_index": 0,
        "shape_index": 1,
        "paragraph_index": index,
        "text": text,
        "translated_text": translated,
        "runs": runs,
    })
    .to_string()
}
