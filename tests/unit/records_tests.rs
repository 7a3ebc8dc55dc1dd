/*!
 * Tests for the line-delimited JSON record types
 */

use runalign::records::{AlignmentMetadata, ParagraphRecord, TableRecord};
use runalign::Run;

#[test]
fn test_paragraphRecord_withMissingFields_shouldUseDefaults() {
    let record: ParagraphRecord = serde_json::from_str(r#"{"text":"Hello"}"#).unwrap();
    assert_eq!(record.text, "Hello");
    assert!(record.translated_text.is_empty());
    assert!(record.runs.is_empty());
    assert!(record.slide_index.is_none());
}

#[test]
fn test_run_withLegacyUrl_shouldResolveHyperlink() {
    let run: Run = serde_json::from_str(r#"{"text":"site","url":"https://example.com"}"#).unwrap();
    assert!(run.format.hyperlink.is_none());
    assert_eq!(run.effective_format().hyperlink.as_deref(), Some("https://example.com"));
}

#[test]
fn test_run_serialization_shouldWriteFlatFormatFields() {
    let value = serde_json::to_value(Run::plain("x")).unwrap();
    assert_eq!(value["text"], "x");
    assert_eq!(value["bold"], false);
    assert!(value.get("format").is_none());
    assert!(value.get("url").is_none());
}

#[test]
fn test_alignmentMetadata_new_shouldCountRuns() {
    let source = vec![Run::plain("a "), Run::plain("b")];
    let aligned = vec![Run::plain("x y")];
    let metadata = AlignmentMetadata::new(&source, &aligned, "a b", "x y");
    assert_eq!(metadata.source_runs_count, 2);
    assert_eq!(metadata.aligned_runs_count, 1);
    assert_eq!(metadata.target_text, "x y");
}

#[test]
fn test_tableRecord_shouldKeepCellExtras() {
    let table: TableRecord = serde_json::from_str(
        r#"{"slide_index":3,"rows":1,"cols":1,"table_style":"Medium 2",
            "cells":[{"row":0,"col":0,"merged":false,"paragraphs":[{"original_text":"Total","level":1}]}]}"#,
    )
    .unwrap();

    assert_eq!(table.extra["table_style"], "Medium 2");
    assert_eq!(table.cells[0].extra["merged"], false);
    assert_eq!(table.cells[0].paragraphs[0].extra["level"], 1);

    let value = serde_json::to_value(&table).unwrap();
    assert_eq!(value["cells"][0]["paragraphs"][0]["level"], 1);
    assert!(value["cells"][0]["paragraphs"][0].get("runs").is_none());
}
