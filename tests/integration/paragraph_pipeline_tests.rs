/*!
 * End-to-end tests for paragraph streams
 */

use std::sync::Arc;

use runalign::alignment::HashedEmbedder;
use runalign::app_config::{Config, EmbeddingBackend};
use runalign::processor::default_debug_path;
use runalign::{AlignmentEngine, Glossary, Run};

use crate::common::{init_test_logging, bold, create_temp_dir, create_test_file, embedding_aligner, engine, paragraph_line, read_jsonl, ZeroEmbedder};

fn aligned_runs(value: &serde_json::Value) -> Vec<Run> {
    serde_json::from_value(value["aligned_runs"].clone()).unwrap()
}

#[tokio::test]
async fn test_processParagraphs_withMixedInput_shouldAlignInOrder() {
    init_test_logging();
    let temp_dir = create_temp_dir().unwrap();
    let input = [
        paragraph_line(0, "The Senate", "Le Sénat", &[Run::plain("The "), bold("Senate")]),
        "{this is not json".to_string(),
        paragraph_line(1, "Hello", "Bonjour", &[bold("Hello")]),
        paragraph_line(2, "Nothing", "", &[Run::plain("Nothing")]),
    ]
    .join("\n");
    let input_path = create_test_file(temp_dir.path(), "translated.jsonl", &input).unwrap();
    let output_path = temp_dir.path().join("aligned.jsonl");
    let debug_path = default_debug_path(&output_path);

    let engine = engine(Arc::new(embedding_aligner(Arc::new(ZeroEmbedder), &[("senate", "sénat")])));
    let summary = engine
        .process_paragraphs(&input_path, &output_path, &debug_path)
        .await
        .unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(summary.aligned, 3);
    assert_eq!(summary.malformed, 1);

    let output = read_jsonl(&output_path).unwrap();
    let indices: Vec<_> = output.iter().map(|v| v["paragraph_index"].as_i64().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    assert_eq!(aligned_runs(&output[0]), vec![Run::plain("Le "), bold("Sénat")]);
    assert_eq!(output[0]["alignment_metadata"]["source_runs_count"], 2);
    assert_eq!(output[0]["alignment_metadata"]["aligned_runs_count"], 2);
    assert!(output[0]["alignment_metadata"].get("alignment_method").is_none());

    assert_eq!(aligned_runs(&output[1]), vec![bold("Bonjour")]);
    assert_eq!(aligned_runs(&output[2]), vec![Run::plain("")]);

    // Paragraphs that took a shortcut on blank text carry no trace
    let debug = read_jsonl(&debug_path).unwrap();
    assert_eq!(debug.len(), 2);
    assert_eq!(debug[0]["alignment_debug"]["alignment_type"], "multi_run");
    assert_eq!(debug[1]["alignment_debug"]["alignment_type"], "single_run");
}

#[tokio::test]
async fn test_processParagraphs_shouldPreserveUnknownFields() {
    let temp_dir = create_temp_dir().unwrap();
    let input = r#"{"slide_index":4,"shape_index":0,"paragraph_index":0,"text":"Hi there","translated_text":"Salut toi","runs":[{"text":"Hi ","italic":true},{"text":"there"}],"shape_name":"Title 1","level":2}"#;
    let input_path = create_test_file(temp_dir.path(), "in.jsonl", input).unwrap();
    let output_path = temp_dir.path().join("nested").join("out.jsonl");
    let debug_path = temp_dir.path().join("trace.jsonl");

    let engine = engine(Arc::new(embedding_aligner(Arc::new(HashedEmbedder::default()), &[])));
    engine.process_paragraphs(&input_path, &output_path, &debug_path).await.unwrap();

    let output = read_jsonl(&output_path).unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0]["shape_name"], "Title 1");
    assert_eq!(output[0]["level"], 2);
    assert_eq!(output[0]["runs"][0]["italic"], true);

    let text: String = aligned_runs(&output[0]).iter().map(|r| r.text.as_str()).collect();
    assert_eq!(text, "Salut toi");
}

#[tokio::test]
async fn test_processParagraphs_withMissingInput_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let engine = engine(Arc::new(embedding_aligner(Arc::new(ZeroEmbedder), &[])));

    let result = engine
        .process_paragraphs(
            &temp_dir.path().join("missing.jsonl"),
            &temp_dir.path().join("out.jsonl"),
            &temp_dir.path().join("out_debug.jsonl"),
        )
        .await;
    assert!(result.is_err());
}

/// The configured engine with a glossary reaches the same result as a hand-built one
#[tokio::test]
async fn test_fromConfig_withHashedBackendAndGlossary_shouldAlignGlossaryTerm() {
    let temp_dir = create_temp_dir().unwrap();
    let input = paragraph_line(
        0,
        "Members of the Senate",
        "Membres du Sénat",
        &[Run::plain("Members of the "), bold("Senate")],
    );
    let input_path = create_test_file(temp_dir.path(), "in.jsonl", &input).unwrap();
    let output_path = temp_dir.path().join("out.jsonl");

    let mut config = Config::default();
    config.embedding.backend = EmbeddingBackend::Hashed;
    let glossary = Glossary::from_json(r#"{"Senate":"Sénat"}"#).unwrap();

    let engine = AlignmentEngine::from_config(&config, Some(Arc::new(glossary))).unwrap();
    engine
        .process_paragraphs(&input_path, &output_path, &default_debug_path(&output_path))
        .await
        .unwrap();

    let output = read_jsonl(&output_path).unwrap();
    let runs = aligned_runs(&output[0]);
    let text: String = runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(text, "Membres du Sénat");
    assert_eq!(runs.last(), Some(&bold("Sénat")));
}

#[tokio::test]
async fn test_processParagraphs_withNullTranslation_shouldWriteSourceRunsThrough() {
    let temp_dir = create_temp_dir().unwrap();
    let input = [
        paragraph_line(0, "The Senate", "Le Sénat", &[Run::plain("The "), bold("Senate")]),
        r#"{"slide_index":0,"shape_index":1,"paragraph_index":1,"text":"Hello","translated_text":null,"runs":[{"text":"Hello","bold":true}],"level":1}"#.to_string(),
    ]
    .join("\n");
    let input_path = create_test_file(temp_dir.path(), "in.jsonl", &input).unwrap();
    let output_path = temp_dir.path().join("out.jsonl");

    let engine = engine(Arc::new(embedding_aligner(Arc::new(ZeroEmbedder), &[("senate", "sénat")])));
    let summary = engine
        .process_paragraphs(&input_path, &output_path, &temp_dir.path().join("debug.jsonl"))
        .await
        .unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.aligned, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.malformed, 0);

    let output = read_jsonl(&output_path).unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[1]["paragraph_index"], 1);
    assert!(output[1]["translated_text"].is_null());
    assert_eq!(output[1]["level"], 1);
    assert_eq!(aligned_runs(&output[1]), vec![bold("Hello")]);
}
