use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::alignment::{AlignerOptions, AlignmentStrategy, ScoringWeights, Thresholds};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Alignment engine settings
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Embedding backend settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Translator settings used by the term-lookup strategy
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Worker pool settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Optional JSON glossary merged into the phrase mappings
    #[serde(default)]
    pub glossary_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Alignment engine settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AlignmentConfig {
    // @field: Strategy selector
    #[serde(default)]
    pub strategy: AlignmentStrategy,

    // @field: Longest phrase in words
    #[serde(default = "default_max_phrase_length")]
    pub max_phrase_length: usize,

    // @field: Base acceptance threshold
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    // @field: Threshold floor for bold or colored source phrases
    #[serde(default = "default_formatted_threshold")]
    pub formatted_threshold: f64,

    // @field: Scoring weights
    #[serde(default)]
    pub weights: ScoringWeights,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            strategy: AlignmentStrategy::default(),
            max_phrase_length: default_max_phrase_length(),
            similarity_threshold: default_similarity_threshold(),
            formatted_threshold: default_formatted_threshold(),
            weights: ScoringWeights::default(),
        }
    }
}

impl AlignmentConfig {
    /// Options handed to the embedding aligner
    pub fn aligner_options(&self) -> AlignerOptions {
        AlignerOptions {
            max_phrase_length: self.max_phrase_length,
            thresholds: Thresholds::new(self.similarity_threshold, self.formatted_threshold),
            weights: self.weights,
        }
    }
}

/// Embedding backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    // @backend: Ollama embeddings endpoint
    #[default]
    Ollama,
    // @backend: Local character-trigram hashing
    Hashed,
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Hashed => write!(f, "hashed"),
        }
    }
}

/// Embedding backend settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    // @field: Backend type
    #[serde(default)]
    pub backend: EmbeddingBackend,

    // @field: Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    // @field: Max concurrent embedding requests per batch
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Vector size of the hashed backend
    #[serde(default = "default_hashed_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            endpoint: default_ollama_endpoint(),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            dimensions: default_hashed_dimensions(),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Paragraphs or tables aligned concurrently
    #[serde(default = "default_concurrent_units")]
    pub concurrent_units: usize,

    /// Per-unit time budget in seconds
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrent_units: default_concurrent_units(),
            unit_timeout_secs: default_unit_timeout_secs(),
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: match provider_type {
                TranslationProvider::Anthropic => default_anthropic_timeout_secs(),
                _ => default_timeout_secs(),
            },
            rate_limit: default_rate_limit(&provider_type),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt for term lookups
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_max_phrase_length() -> usize {
    4
}

fn default_similarity_threshold() -> f64 {
    0.3
}

fn default_formatted_threshold() -> f64 {
    0.4
}

fn default_concurrent_units() -> usize {
    4
}

fn default_unit_timeout_secs() -> u64 {
    120
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

fn default_hashed_dimensions() -> usize {
    256
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_temperature() -> f32 {
    0.0
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "llama3.2:3b",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-haiku-20240307",
        // Placeholder; set to the model loaded in LM Studio
        TranslationProvider::LMStudio => "local-model",
    }
    .to_string()
}

fn default_endpoint(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => default_ollama_endpoint(),
        TranslationProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        TranslationProvider::Anthropic => "https://api.anthropic.com".to_string(),
        TranslationProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_rate_limit(provider: &TranslationProvider) -> Option<u32> {
    match provider {
        // Below Anthropic's 50 requests per minute
        TranslationProvider::Anthropic => Some(45),
        TranslationProvider::OpenAI => Some(60),
        TranslationProvider::Ollama | TranslationProvider::LMStudio => None,
    }
}

fn default_system_prompt() -> String {
    "You are a precise bilingual assistant working with {source_language} texts and their {target_language} translations. When asked to find a phrase, answer with the exact {target_language} words as they appear in the translation and nothing else.".to_string()
}

impl Config {
    /// Load the configuration from `path`, writing a default one first if missing
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.source_language)?;
        crate::language_utils::get_language_name(&self.target_language)?;
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target languages are the same: {} and {}",
                self.source_language,
                self.target_language
            ));
        }

        let alignment = &self.alignment;
        if alignment.max_phrase_length == 0 {
            return Err(anyhow!("alignment.max_phrase_length must be at least 1"));
        }
        for (name, value) in [
            ("similarity_threshold", alignment.similarity_threshold),
            ("formatted_threshold", alignment.formatted_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("alignment.{} must be between 0 and 1, got {}", name, value));
            }
        }
        let weights = alignment.weights;
        if [weights.embedding, weights.semantic, weights.length, weights.character]
            .iter()
            .any(|w| *w < 0.0 || !w.is_finite())
        {
            return Err(anyhow!("alignment.weights must be finite and non-negative"));
        }

        if self.processing.concurrent_units == 0 {
            return Err(anyhow!("processing.concurrent_units must be at least 1"));
        }
        if self.processing.unit_timeout_secs == 0 {
            return Err(anyhow!("processing.unit_timeout_secs must be at least 1"));
        }
        if self.embedding.backend == EmbeddingBackend::Hashed && self.embedding.dimensions == 0 {
            return Err(anyhow!("embedding.dimensions must be at least 1"));
        }

        // API keys only matter when the translator is actually used
        if alignment.strategy == AlignmentStrategy::Llm {
            match self.translation.provider {
                TranslationProvider::OpenAI | TranslationProvider::Anthropic => {
                    if self.translation.get_api_key().is_empty() {
                        return Err(anyhow!(
                            "Translation API key is required for {} provider",
                            self.translation.provider.display_name()
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// English names of the configured languages
    pub fn language_names(&self) -> Result<(String, String)> {
        Ok((
            crate::language_utils::get_language_name(&self.source_language)?,
            crate::language_utils::get_language_name(&self.target_language)?,
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            alignment: AlignmentConfig::default(),
            embedding: EmbeddingConfig::default(),
            translation: TranslationConfig::default(),
            processing: ProcessingConfig::default(),
            glossary_path: None,
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        match self.get_active_provider_config() {
            Some(p) if !p.model.is_empty() => p.model.clone(),
            _ => default_model(&self.provider),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        match self.get_active_provider_config() {
            Some(p) if !p.endpoint.is_empty() => p.endpoint.clone(),
            _ => default_endpoint(&self.provider),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(p) => p.rate_limit,
            None => default_rate_limit(&self.provider),
        }
    }

    /// Set the model of the active provider, adding its entry if missing
    pub fn set_model(&mut self, model: impl Into<String>) {
        let provider_str = self.provider.to_lowercase_string();
        if !self.available_providers.iter().any(|p| p.provider_type == provider_str) {
            self.available_providers.push(ProviderConfig::new(self.provider.clone()));
        }
        if let Some(p) = self
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            p.model = model.into();
        }
    }

    /// System prompt with language placeholders filled in
    pub fn system_prompt(&self, source_language: &str, target_language: &str) -> String {
        self.common
            .system_prompt
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
