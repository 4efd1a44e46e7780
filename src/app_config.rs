use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::errors::AppError;
use crate::translation::memory::RESERVED_FIELDS;
use crate::translation::rate_limit::RateLimit;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Languages every package is translated into
    pub target_languages: Vec<String>,

    /// Version folders a package may ship (e.g. "1.4", "1.5")
    #[serde(default)]
    pub game_versions: Vec<String>,

    /// Directory holding one sub-directory per downloaded package
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,

    /// Directory holding the translation memory files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory receiving the per-language output files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Packages to process
    #[serde(default)]
    pub packages: Vec<PackageConfig>,

    /// Package ids that are never processed
    #[serde(default)]
    pub blacklist_ids: Vec<String>,

    /// File name fragment preferred when looking for the raw source file
    #[serde(default = "default_source_keyword")]
    pub source_keyword: String,

    /// Translation backend config
    pub translator: TranslatorConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// One content package
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PackageConfig {
    // @field: Opaque package id, also the directory name under content_dir
    pub id: String,

    // @field: Display name used in output file names
    #[serde(default)]
    pub name: String,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorProvider {
    // @provider: plain phrase translator
    #[default]
    Plain,
    // @provider: OpenAI-style chat completion endpoint
    Llm,
}

impl TranslatorProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Plain => "Plain",
            Self::Llm => "LLM",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Plain => "plain".to_string(),
            Self::Llm => "llm".to_string(),
        }
    }
}

impl std::fmt::Display for TranslatorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslatorProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "google" => Ok(Self::Plain),
            "llm" | "openai" => Ok(Self::Llm),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Translation backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslatorConfig {
    /// Backend to use
    #[serde(default)]
    pub provider: TranslatorProvider,

    /// Inputs shorter than this many characters are returned unchanged
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Request budget such as "10/s", "60/m" or "1000/h"
    #[serde(default = "default_rate_limit")]
    pub rate_limit: String,

    /// Attempts per entry and language before falling back to the source text
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// LLM backend settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Plain backend settings
    #[serde(default)]
    pub plain: PlainConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: TranslatorProvider::default(),
            min_length: default_min_length(),
            rate_limit: default_rate_limit(),
            retry_count: default_retry_count(),
            llm: LlmConfig::default(),
            plain: PlainConfig::default(),
        }
    }
}

/// OpenAI-style LLM configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Full chat completions URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Bearer token
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// System prompt; `{language}` is replaced with the target language
    #[serde(default = "default_system_prompt")]
    pub prompt: String,

    /// Price per input token
    #[serde(default)]
    pub input_price: f64,

    /// Price per output token
    #[serde(default)]
    pub output_price: f64,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: String::new(),
            model: default_llm_model(),
            prompt: default_system_prompt(),
            input_price: 0.0,
            output_price: 0.0,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Plain phrase translator configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlainConfig {
    /// Translate URL
    #[serde(default = "default_plain_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_plain_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlainConfig {
    fn default() -> Self {
        Self {
            endpoint: default_plain_endpoint(),
            timeout_secs: default_plain_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
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
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_source_keyword() -> String {
    "en".to_string()
}

fn default_min_length() -> usize {
    3
}

fn default_rate_limit() -> String {
    "10/s".to_string()
}

fn default_retry_count() -> u32 {
    3
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_plain_endpoint() -> String {
    "http://localhost:5000/translate".to_string()
}

fn default_plain_timeout_secs() -> u64 {
    30
}

fn default_system_prompt() -> String {
    "You are a helpful assistant that helps people with translation. \
     Translate the given text to {language} and only return the translated text."
        .to_string()
}

impl Config {
    /// Load a configuration file, creating one with defaults when it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            log::warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), AppError> {
        self.validate_languages()?;
        self.translator.validate()
    }

    /// Validate target languages only; enough for work without a backend
    pub fn validate_languages(&self) -> Result<(), AppError> {
        if self.target_languages.is_empty() {
            return Err(AppError::Config("At least one target language is required".into()));
        }
        for language in &self.target_languages {
            if language.trim().is_empty() {
                return Err(AppError::Config("Target language codes cannot be empty".into()));
            }
            if RESERVED_FIELDS.contains(&language.as_str()) {
                return Err(AppError::Config(format!(
                    "'{}' is reserved by the memory format and cannot be a target language",
                    language
                )));
            }
        }
        Ok(())
    }

    /// Packages that are configured and not blacklisted
    pub fn active_packages(&self) -> impl Iterator<Item = &PackageConfig> {
        self.packages
            .iter()
            .filter(|p| !self.blacklist_ids.contains(&p.id))
    }
}

impl TranslatorConfig {
    /// Validate backend settings; every failure here is fatal
    pub fn validate(&self) -> Result<(), AppError> {
        self.rate_limit.parse::<RateLimit>()
            .map_err(|e| AppError::Config(format!("Invalid rate limit '{}': {}", self.rate_limit, e)))?;

        if self.retry_count == 0 {
            return Err(AppError::Config("retry_count must be at least 1".into()));
        }

        match self.provider {
            TranslatorProvider::Llm => {
                if self.llm.api_key.is_empty() {
                    return Err(AppError::Config("API token is required for the LLM provider".into()));
                }
                if self.llm.model.is_empty() {
                    return Err(AppError::Config("A model name is required for the LLM provider".into()));
                }
                validate_endpoint(&self.llm.endpoint)
            }
            TranslatorProvider::Plain => validate_endpoint(&self.plain.endpoint),
        }
    }

    /// Endpoint of the active backend
    pub fn get_endpoint(&self) -> &str {
        match self.provider {
            TranslatorProvider::Llm => &self.llm.endpoint,
            TranslatorProvider::Plain => &self.plain.endpoint,
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), AppError> {
    let url = Url::parse(endpoint)
        .map_err(|e| AppError::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::Config(format!("Unsupported endpoint scheme '{}'", other))),
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_languages: vec!["zh".to_string()],
            game_versions: Vec::new(),
            content_dir: default_content_dir(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            packages: Vec::new(),
            blacklist_ids: Vec::new(),
            source_keyword: default_source_keyword(),
            translator: TranslatorConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
