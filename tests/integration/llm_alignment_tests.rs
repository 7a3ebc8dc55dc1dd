/*!
 * Tests for term-lookup alignment through a translator
 */

use std::sync::Arc;

use runalign::alignment::{AlignmentType, FormattingAligner, LlmAligner};
use runalign::providers::mock::MockTranslator;
use runalign::{Glossary, GlossaryEntry, Run, RunFormat};

use crate::common::{bold, engine, italic};

const SOURCE: &str = "The Senate and the House met";
const TARGET: &str = "Le Sénat et la Chambre se sont réunis";

fn source_runs() -> Vec<Run> {
    vec![
        Run::plain("The "),
        bold("Senate"),
        Run::plain(" and the "),
        italic("House"),
        Run::plain(" met"),
    ]
}

fn aligner(translator: MockTranslator) -> LlmAligner {
    LlmAligner::new(Arc::new(translator), "English", "French")
}

#[tokio::test]
async fn test_llmAligner_withKnownTerms_shouldFormatLocatedSpans() {
    let translator = MockTranslator::working()
        .with_answer("Senate", "Sénat")
        .with_answer("House", "\"Chambre\".");

    let outcome = aligner(translator.clone()).align(SOURCE, TARGET, &source_runs()).await.unwrap();

    assert_eq!(
        outcome.runs,
        vec![
            Run::plain("Le "),
            bold("Sénat"),
            Run::plain(" et la "),
            italic("Chambre"),
            Run::plain(" se sont réunis"),
        ]
    );
    assert_eq!(translator.request_count(), 2);
    assert!(translator.prompts()[0].contains("Find where \"Senate\" appears in the French translation"));

    let trace = outcome.debug.unwrap();
    assert_eq!(trace.alignment_type, AlignmentType::LlmIndividual);
    let mapping = trace.term_mapping.unwrap();
    assert_eq!(mapping.formatted_runs_count, 2);
    assert_eq!(mapping.successful_mappings, 2);
    assert_eq!(mapping.individual_mappings["House"], "Chambre");
}

#[tokio::test]
async fn test_llmAligner_withAnswerNotInTarget_shouldLeaveTermUnformatted() {
    let translator = MockTranslator::working()
        .with_answer("Senate", "Sénat")
        .with_answer("House", "Parlement");

    let outcome = aligner(translator).align(SOURCE, TARGET, &source_runs()).await.unwrap();

    assert_eq!(outcome.runs, vec![Run::plain("Le "), bold("Sénat"), Run::plain(" et la Chambre se sont réunis")]);
    let mapping = outcome.debug.unwrap().term_mapping.unwrap();
    assert_eq!(mapping.failed_mappings, 1);
}

#[tokio::test]
async fn test_llmAligner_withFailingTranslator_shouldReturnPlainTarget() {
    let outcome = aligner(MockTranslator::failing())
        .align(SOURCE, TARGET, &source_runs())
        .await
        .unwrap();

    assert_eq!(outcome.runs, vec![Run::plain(TARGET)]);
    assert_eq!(outcome.debug.unwrap().term_mapping.unwrap().successful_mappings, 0);
}

#[tokio::test]
async fn test_llmAligner_withEmptyAnswers_shouldNotClaimSpans() {
    let outcome = aligner(MockTranslator::empty())
        .align(SOURCE, TARGET, &source_runs())
        .await
        .unwrap();
    assert_eq!(outcome.runs, vec![Run::plain(TARGET)]);
}

#[tokio::test]
async fn test_llmAligner_withRepeatedTerm_shouldUseNextOccurrence() {
    let runs = vec![bold("tax"), Run::plain(" on "), italic("tax"), Run::plain(" income")];
    let translator = MockTranslator::working().with_answer("tax", "impôt");

    let outcome = aligner(translator)
        .align("tax on tax income", "impôt sur impôt revenu", &runs)
        .await
        .unwrap();

    assert_eq!(
        outcome.runs,
        vec![bold("impôt"), Run::plain(" sur "), italic("impôt"), Run::plain(" revenu")]
    );
}

#[tokio::test]
async fn test_llmAligner_withoutSpecialRuns_shouldSkipLookups() {
    let translator = MockTranslator::working();
    let runs = vec![Run::plain("Hello "), Run::plain("world")];

    let outcome = aligner(translator.clone()).align("Hello world", "Bonjour le monde", &runs).await.unwrap();

    assert_eq!(outcome.runs, vec![Run::plain("Bonjour le monde")]);
    assert_eq!(outcome.debug.map(|d| d.alignment_type), Some(AlignmentType::NoFormatting));
    assert_eq!(translator.request_count(), 0);
}

#[tokio::test]
async fn test_llmAligner_withSingleLinkedRun_shouldCarryLegacyUrl() {
    let mut run = Run::plain("our site");
    run.url = Some("https://example.com".into());

    let outcome = aligner(MockTranslator::working()).align("our site", "notre site", &[run]).await.unwrap();

    let expected = RunFormat {
        hyperlink: Some("https://example.com".into()),
        ..Default::default()
    };
    assert_eq!(outcome.runs, vec![Run::new("notre site", expected)]);
}

#[tokio::test]
async fn test_llmAligner_withGlossary_shouldStillLocateTerms() {
    let glossary = Glossary::from_entries(vec![GlossaryEntry::new("Senate", "Sénat").with_priority(10)]);
    let translator = MockTranslator::working().with_answer("Senate", "Sénat");
    let aligner = aligner(translator).with_glossary(Arc::new(glossary));

    let runs = vec![Run::plain("The "), bold("Senate")];
    let outcome = aligner.align("The Senate", "Le Sénat", &runs).await.unwrap();
    assert_eq!(outcome.runs, vec![Run::plain("Le "), bold("Sénat")]);
}

#[tokio::test]
async fn test_engine_withLlmAligner_shouldTagAlignmentMethod() {
    let translator = MockTranslator::working().with_answer("Senate", "Sénat");
    let engine = engine(Arc::new(aligner(translator)));

    let record = serde_json::from_value(serde_json::json!({
        "text": "The Senate",
        "translated_text": "Le Sénat",
        "runs": [{"text": "The "}, {"text": "Senate", "bold": true}],
    }))
    .unwrap();

    let result = engine.align_paragraph(record).await;
    let metadata = result.record.alignment_metadata.unwrap();
    assert_eq!(metadata.alignment_method.as_deref(), Some("llm"));
    assert_eq!(result.record.aligned_runs, Some(vec![Run::plain("Le "), bold("Sénat")]));
}
