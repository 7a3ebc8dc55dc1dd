use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::alignment::EmbeddingProvider;
use crate::errors::ProviderError;

use super::{error_body, excerpt, status_error, Provider, RetryPolicy};

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry, backoff and pacing
    retry: RetryPolicy,
}

impl fmt::Debug for Ollama {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ollama").field("base_url", &self.base_url).finish()
    }
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

/// Embeddings request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Model name to use for the embedding
    model: String,
    /// Prompt to generate embeddings for
    prompt: String,
}

/// Embeddings response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
            keep_alive: None,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Cap the number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(max_tokens);
        self
    }

    /// Set the keep-alive duration
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// Parse a generate response body.
///
/// Accepts a single JSON object or, when the server streamed anyway, JSON lines
/// whose `response` fragments are concatenated.
pub fn parse_generation_response(body: &str) -> Result<GenerationResponse, ProviderError> {
    match serde_json::from_str::<GenerationResponse>(body) {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}", e, excerpt(body));

            let mut model = String::new();
            let mut text = String::new();
            let mut parsed_any = false;
            for line in body.lines().filter(|l| !l.trim().is_empty()) {
                let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                    continue;
                };
                parsed_any = true;
                if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                    text.push_str(part);
                }
                if let Some(m) = value.get("model").and_then(|v| v.as_str()) {
                    model = m.to_string();
                }
            }

            if parsed_any {
                Ok(GenerationResponse {
                    model,
                    response: text,
                    done: true,
                    prompt_eval_count: None,
                    eval_count: None,
                })
            } else {
                Err(ProviderError::ParseError(format!(
                    "Failed to parse Ollama API response: {}. Response contains invalid JSON.",
                    e
                )))
            }
        }
    }
}

impl Ollama {
    /// Create a new Ollama client
    ///
    /// `endpoint` is a base URL such as `http://localhost:11434`.
    pub fn new_with_config(
        endpoint: impl Into<String>,
        max_retries: u32,
        backoff_base_ms: u64,
        rate_limit: Option<u32>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            base_url: endpoint.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            retry: RetryPolicy::new(max_retries, backoff_base_ms, rate_limit),
        }
    }

    /// Create a client with default retry settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::new_with_config(endpoint, 3, 1000, None, 60)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let (url, request) = (&url, &request);

        self.retry
            .execute("Ollama generate", move || async move {
                let response = self.client.post(url).json(request).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_error(status, error_body(response).await));
                }
                let body = response.text().await?;
                parse_generation_response(&body)
            })
            .await
    }

    /// Generate an embedding from the Ollama API with retry logic
    pub async fn embed(&self, model: &str, prompt: &str) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
        };

        let (url, request) = (&url, &request);

        self.retry
            .execute("Ollama embeddings", move || async move {
                let response = self.client.post(url).json(request).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(status_error(status, error_body(response).await));
                }
                let body = response.text().await?;
                serde_json::from_str::<EmbeddingResponse>(&body).map_err(|e| {
                    error!("Failed to parse Ollama embeddings response: {}. Raw response: {}", e, excerpt(&body));
                    ProviderError::ParseError(e.to_string())
                })
            })
            .await
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url).send().await?.json().await?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.generate(request).await
    }

    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = GenerationRequest::new(model, "Hello").max_tokens(10);
        self.generate(request).await.map(|_| ())
    }

    fn extract_text(response: &GenerationResponse) -> String {
        response.response.clone()
    }
}

/// Embedding provider backed by an Ollama embedding model
#[derive(Debug)]
pub struct OllamaEmbedder {
    client: Ollama,
    model: String,
    concurrent_requests: usize,
}

impl OllamaEmbedder {
    pub fn new(client: Ollama, model: impl Into<String>, concurrent_requests: usize) -> Self {
        Self {
            client,
            model: model.into(),
            concurrent_requests: concurrent_requests.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.client.embed(&self.model, text).await?.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        debug!("Embedding {} phrases with {}", texts.len(), self.model);
        // `buffered` keeps input order
        stream::iter(texts.iter().map(|text| self.embed(text)).collect::<Vec<_>>())
            .buffered(self.concurrent_requests)
            .try_collect()
            .await
    }
}
