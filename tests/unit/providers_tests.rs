/*!
 * Tests for the provider implementations, the mocks and the translator
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use runalign::alignment::EmbeddingProvider;
use runalign::app_config::{Config, TranslationProvider};
use runalign::errors::ProviderError;
use runalign::providers::anthropic::{Anthropic, AnthropicResponse};
use runalign::providers::mock::{MockBehavior, MockEmbedder, MockTranslator};
use runalign::providers::ollama::{parse_generation_response, Ollama, OllamaEmbedder};
use runalign::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use runalign::providers::{Provider, RetryPolicy};
use runalign::{ProviderTranslator, Translator};

/// Test a live Ollama embedding endpoint
#[tokio::test]
#[ignore]
async fn test_ollama_embedder_withRunningServer_shouldReturnVectors() {
    let client = Ollama::new("http://localhost:11434");
    let embedder = OllamaEmbedder::new(client, "nomic-embed-text", 2);

    let texts = vec!["The Senate".to_string(), "Le Sénat".to_string()];
    let vectors = embedder.embed_batch(&texts).await.unwrap();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), vectors[1].len());
}

#[test]
fn test_openaiRequest_shouldSerializeOptionalFieldsOnlyWhenSet() {
    let request = OpenAIRequest::new("gpt-4o-mini").add_message("user", "Find it");
    let value = serde_json::to_value(&request).unwrap();
    assert!(value.get("temperature").is_none());
    assert_eq!(value["messages"][0]["role"], "user");

    let value = serde_json::to_value(request.temperature(0.0).max_tokens(64)).unwrap();
    assert_eq!(value["max_tokens"], 64);
}

#[test]
fn test_openaiResponse_withoutUsage_shouldExtractFirstChoice() {
    let response: OpenAIResponse = serde_json::from_str(
        r#"{"choices":[{"message":{"role":"assistant","content":"Sénat"}},
                       {"message":{"role":"assistant","content":"ignored"}}]}"#,
    )
    .unwrap();
    assert!(response.usage.is_none());
    assert_eq!(OpenAI::extract_text(&response), "Sénat");
}

#[test]
fn test_anthropicResponse_shouldJoinTextBlocks() {
    let response: AnthropicResponse = serde_json::from_str(
        r#"{"content":[{"type":"text","text":"Le "},{"type":"tool_use"},{"type":"text","text":"Sénat"}],
            "usage":{"input_tokens":12,"output_tokens":3}}"#,
    )
    .unwrap();
    assert_eq!(Anthropic::extract_text(&response), "Le Sénat");
}

#[test]
fn test_ollamaResponse_withStreamedLines_shouldConcatenate() {
    let body = "{\"model\":\"llama3.2:3b\",\"response\":\"Sé\",\"done\":false}\n{\"model\":\"llama3.2:3b\",\"response\":\"nat\",\"done\":true}";
    let response = parse_generation_response(body).unwrap();
    assert_eq!(response.response, "Sénat");
    assert!(matches!(parse_generation_response("<html>"), Err(ProviderError::ParseError(_))));
}

#[tokio::test]
async fn test_retryPolicy_withTransientErrors_shouldRetryUntilSuccess() {
    let policy = RetryPolicy::new(3, 1, None);
    let attempts = Arc::new(AtomicUsize::new(0));

    let counter = attempts.clone();
    let result = policy
        .execute("test", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::ConnectionError("reset".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retryPolicy_withAuthError_shouldNotRetry() {
    let policy = RetryPolicy::new(3, 1, None);
    let attempts = Arc::new(AtomicUsize::new(0));

    let counter = attempts.clone();
    let result: Result<(), _> = policy
        .execute("test", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::AuthenticationError("bad key".to_string()))
            }
        })
        .await;

    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_mockTranslator_intermittent_shouldFailEveryNth() {
    let translator = MockTranslator::new(MockBehavior::Intermittent { fail_every: 2 });
    assert!(translator.translate("a", None).await.is_ok());
    assert!(translator.translate("b", None).await.is_err());
    assert!(translator.translate("c", None).await.is_ok());
    assert_eq!(translator.request_count(), 3);
}

#[tokio::test]
async fn test_mockEmbedder_withPinnedVector_shouldReturnIt() {
    let embedder = MockEmbedder::working(8).with_vector("Senate", vec![1.0; 8]);
    assert_eq!(embedder.embed("Senate").await.unwrap(), vec![1.0; 8]);
    assert_eq!(embedder.embed("Sénat").await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_mockEmbedder_failing_shouldReturnApiError() {
    let embedder = MockEmbedder::failing();
    assert!(matches!(
        embedder.embed("anything").await,
        Err(ProviderError::ApiError { status_code: 500, .. })
    ));
}

#[test]
fn test_providerTranslator_withMissingApiKey_shouldFail() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    let error = ProviderTranslator::from_config(&config.translation, "English", "French").unwrap_err();
    assert!(error.to_string().contains("API key"));
}

#[test]
fn test_providerTranslator_withInvalidEndpoint_shouldFail() {
    let mut config = Config::default();
    if let Some(provider) = config
        .translation
        .available_providers
        .iter_mut()
        .find(|p| p.provider_type == "ollama")
    {
        provider.endpoint = "not a url".to_string();
    }
    assert!(ProviderTranslator::from_config(&config.translation, "English", "French").is_err());
}

#[test]
fn test_providerTranslator_withLmStudio_shouldNotNeedKey() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::LMStudio;
    let translator = ProviderTranslator::from_config(&config.translation, "English", "French").unwrap();
    assert_eq!(translator.model(), "local-model");
    assert_eq!(translator.provider(), &TranslationProvider::LMStudio);
}
