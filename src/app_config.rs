use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or "auto" to let the model detect it
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Model and request settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Segmenter and context digest settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Where and how the result file is written
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
///
/// Every provider speaks the OpenAI chat-completions protocol; they only
/// differ in their default endpoint and model.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: DeepSeek (OpenAI-compatible)
    #[default]
    DeepSeek,
    // @provider: OpenAI
    OpenAI,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::OpenAI => "OpenAI",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::DeepSeek => "deepseek".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether requests to this provider need an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::LMStudio)
    }

    fn default_endpoint(&self) -> String {
        match self {
            Self::DeepSeek => "https://api.deepseek.com".to_string(),
            Self::OpenAI => "https://api.openai.com/v1".to_string(),
            // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
            Self::LMStudio => "http://localhost:1234/v1".to_string(),
        }
    }

    fn default_model(&self) -> String {
        match self {
            Self::DeepSeek => "deepseek-chat".to_string(),
            Self::OpenAI => "gpt-4o-mini".to_string(),
            // Placeholder; users should set to the loaded model name in LM Studio
            Self::LMStudio => "local-model".to_string(),
        }
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAI),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    // @field: Model name, empty means the provider default
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key, usually supplied through the environment instead
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL, empty means the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Timeout for a single model call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    /// Lower values make output more deterministic, higher values more creative
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on completion tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Retries per chunk before the job is abandoned (0 = fail fast)
    #[serde(default)]
    pub retry_count: u32,

    /// Backoff base in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            retry_count: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl TranslationConfig {
    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }
        self.provider.default_model()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        self.provider.default_endpoint()
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }

        // LM Studio often doesn't require an API key; use a placeholder if empty
        if self.provider == TranslationProvider::LMStudio {
            return "lm-studio".to_string();
        }

        String::new()
    }

    /// Timeout applied around every model call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Segmenter and context digest settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum token units per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Token units repeated at the start of the next chunk
    #[serde(default)]
    pub chunk_overlap: usize,

    /// Characters of the previous translation carried into the next prompt
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    /// Split words that exceed the chunk size at character boundaries
    /// instead of rejecting the document
    #[serde(default = "default_true")]
    pub split_long_words: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            context_chars: default_context_chars(),
            split_long_words: true,
        }
    }
}

/// Output file settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Prefix added to the input file name
    #[serde(default = "default_output_prefix")]
    pub prefix: String,

    /// Output directory; the input file's directory when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Replace a result left over from an earlier run
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_output_prefix(),
            directory: None,
            overwrite: true,
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
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_chunk_size() -> usize {
    2000
}

fn default_context_chars() -> usize {
    500
}

fn default_output_prefix() -> String {
    "translated_".to_string()
}

fn default_true() -> bool {
    true
}

fn default_system_prompt() -> String {
    crate::translation::prompts::PromptTemplate::DOCUMENT_TRANSLATOR.to_string()
}

impl Config {
    /// Load the configuration from `path`, writing a default file first if
    /// none exists yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !self.source_language.eq_ignore_ascii_case("auto") {
            crate::language_utils::get_language_name(&self.source_language)
                .context("Invalid source language")?;
        }
        crate::language_utils::get_language_name(&self.target_language)
            .context("Invalid target language")?;
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target language are the same ({}), nothing to translate",
                self.target_language
            ));
        }

        if self.chunking.chunk_size == 0 {
            return Err(anyhow!("chunk_size must be greater than zero"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(anyhow!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            ));
        }

        let endpoint = self.translation.get_endpoint();
        let url = url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid endpoint: {}", endpoint))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!("Endpoint must use http or https: {}", endpoint));
        }

        if self.translation.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than zero"));
        }

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        if self.output.prefix.is_empty() && self.output.directory.is_none() {
            return Err(anyhow!(
                "An empty output prefix needs an explicit output directory, otherwise the source file would be overwritten"
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            chunking: ChunkingConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
