/*!
 * Translator abstraction used by the term-lookup aligner.
 *
 * A translator answers one prompt with one piece of text. `ProviderTranslator`
 * routes prompts to the configured completion backend and keeps the most recent
 * answers, so a paragraph repeated across slides (titles, footers) is looked up once.
 */

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::time::Instant;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

/// Answer budget for term lookups; answers are a few words
const LOOKUP_MAX_TOKENS: u32 = 256;

/// Answers kept by a `ProviderTranslator`
const ANSWER_CACHE_CAPACITY: usize = 256;

/// Prompt answers, evicting the oldest entry once full
#[derive(Debug)]
pub struct AnswerCache {
    capacity: usize,
    answers: HashMap<String, String>,
    order: VecDeque<String>,
}

impl AnswerCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            answers: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.answers.get(key)
    }

    pub fn insert(&mut self, key: String, answer: String) {
        if self.capacity == 0 {
            return;
        }
        if self.answers.insert(key.clone(), answer).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.answers.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Something that can answer a prompt with text
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Send `text` and return the answer.
    ///
    /// `context` is appended to the system prompt when present.
    async fn translate(&self, text: &str, context: Option<&str>) -> Result<String, ProviderError>;
}

/// Backend clients
#[derive(Debug)]
enum Backend {
    Ollama(Ollama),
    /// OpenAI and OpenAI-compatible servers (LM Studio)
    OpenAI(OpenAI),
    Anthropic(Anthropic),
}

/// Translator backed by one of the configured completion providers
#[derive(Debug)]
pub struct ProviderTranslator {
    backend: Backend,
    provider: TranslationProvider,
    model: String,
    system_prompt: String,
    temperature: f32,
    cache: Mutex<AnswerCache>,
}

impl ProviderTranslator {
    /// Build a translator for the active provider in `config`
    ///
    /// Language names fill the system prompt placeholders.
    pub fn from_config(config: &TranslationConfig, source_language: &str, target_language: &str) -> Result<Self> {
        let endpoint = config.get_endpoint();
        if !endpoint.is_empty() {
            Url::parse(&endpoint).with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;
        }

        let retry_count = config.common.retry_count;
        let retry_backoff_ms = config.common.retry_backoff_ms;
        let rate_limit = config.get_rate_limit();
        let timeout_secs = config.get_timeout_secs();

        let backend = match config.provider {
            TranslationProvider::Ollama => Backend::Ollama(Ollama::new_with_config(
                endpoint,
                retry_count,
                retry_backoff_ms,
                rate_limit,
                timeout_secs,
            )),
            TranslationProvider::OpenAI => {
                let api_key = config.get_api_key();
                if api_key.is_empty() {
                    return Err(anyhow!("OpenAI API key is required"));
                }
                Backend::OpenAI(OpenAI::new_with_config(
                    api_key,
                    endpoint,
                    retry_count,
                    retry_backoff_ms,
                    rate_limit,
                    timeout_secs,
                ))
            }
            // LM Studio usually runs without a key
            TranslationProvider::LMStudio => Backend::OpenAI(OpenAI::new_with_config(
                config.get_api_key(),
                endpoint,
                retry_count,
                retry_backoff_ms,
                rate_limit,
                timeout_secs,
            )),
            TranslationProvider::Anthropic => {
                let api_key = config.get_api_key();
                if api_key.is_empty() {
                    return Err(anyhow!("Anthropic API key is required"));
                }
                Backend::Anthropic(Anthropic::new_with_config(
                    api_key,
                    endpoint,
                    retry_count,
                    retry_backoff_ms,
                    rate_limit,
                    timeout_secs,
                ))
            }
        };

        Ok(Self {
            backend,
            provider: config.provider.clone(),
            model: config.get_model(),
            system_prompt: config.system_prompt(source_language, target_language),
            temperature: config.common.temperature,
            cache: Mutex::new(AnswerCache::new(ANSWER_CACHE_CAPACITY)),
        })
    }

    pub fn provider(&self) -> &TranslationProvider {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the backend answers
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.backend {
            Backend::Ollama(client) => client.test_connection(&self.model).await,
            Backend::OpenAI(client) => client.test_connection(&self.model).await,
            Backend::Anthropic(client) => client.test_connection(&self.model).await,
        }
    }

    fn system_for(&self, context: Option<&str>) -> String {
        match context {
            Some(extra) if !extra.trim().is_empty() => format!("{}\n\n{}", self.system_prompt, extra),
            _ => self.system_prompt.clone(),
        }
    }
}

#[async_trait]
impl Translator for ProviderTranslator {
    async fn translate(&self, text: &str, context: Option<&str>) -> Result<String, ProviderError> {
        let system = self.system_for(context);
        let cache_key = format!("{}\u{0}{}", system, text);
        let cached = self.cache.lock().get(&cache_key).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let start_time = Instant::now();
        let answer = match &self.backend {
            Backend::Ollama(client) => {
                let request = GenerationRequest::new(&self.model, text)
                    .system(&system)
                    .temperature(self.temperature)
                    .max_tokens(LOOKUP_MAX_TOKENS);
                Ollama::extract_text(&client.complete(request).await?)
            }
            Backend::OpenAI(client) => {
                let request = OpenAIRequest::new(&self.model)
                    .add_message("system", &system)
                    .add_message("user", text)
                    .temperature(self.temperature)
                    .max_tokens(LOOKUP_MAX_TOKENS);
                let response = client.complete(request).await?;
                if response.choices.is_empty() {
                    return Err(ProviderError::ParseError(
                        "OpenAI-compatible provider returned no choices".to_string(),
                    ));
                }
                OpenAI::extract_text(&response)
            }
            Backend::Anthropic(client) => {
                let request = AnthropicRequest::new(&self.model, LOOKUP_MAX_TOKENS)
                    .system(&system)
                    .add_message("user", text)
                    .temperature(self.temperature);
                Anthropic::extract_text(&client.complete(request).await?)
            }
        };

        debug!("{} answered in {:?}", self.provider.display_name(), start_time.elapsed());
        self.cache.lock().insert(cache_key, answer.clone());
        Ok(answer)
    }
}
