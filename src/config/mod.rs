//! Configuration management for the SUSTAIN service

use indexmap::IndexMap;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod loader;
pub mod validation;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub accounting: AccountingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size")]
    pub max_body_size_kb: usize,

    /// Origins allowed by CORS (empty = any origin)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Configuration for the remote chat-completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Chat completions endpoint URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Provider API key (secured)
    #[serde(
        default = "default_api_key",
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub api_key: Secret<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Output token ceiling per completion
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Model used when the caller names none or an unknown one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Models callers may select
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,

    /// Enable the response cache
    #[serde(default)]
    pub cache_enabled: bool,

    /// Cache maximum size
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

/// Input optimizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Newline-delimited phrase list removed from prompts
    #[serde(default = "default_stopwords_path")]
    pub stopwords_path: String,

    /// Inputs are truncated to this many characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

/// Energy and CO2 accounting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    /// kg CO2 per kWh
    #[serde(default = "default_co2_per_kwh")]
    pub co2_per_kwh: f64,

    /// kWh per token used by the running-total report
    #[serde(default = "default_energy_per_token")]
    pub reporting_energy_per_token: f64,

    /// kWh per token for each model
    #[serde(default = "default_model_energy")]
    pub model_energy_per_token: IndexMap<String, f64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_server_host() -> String { "0.0.0.0".to_string() }
fn default_server_port() -> u16 { 3001 }
fn default_max_body_size() -> usize { 100 }
fn default_api_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_api_key() -> Secret<String> {
    Secret::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
}
fn default_timeout() -> u64 { 30 }
fn default_max_output_tokens() -> u32 { 50 }
fn default_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_allowed_models() -> Vec<String> {
    vec!["gpt-3.5-turbo".to_string(), "gpt-4o".to_string()]
}
fn default_cache_size() -> usize { 1000 }
fn default_cache_ttl() -> u64 { 3600 }
fn default_stopwords_path() -> String { "data/phrases_to_remove.txt".to_string() }
fn default_max_input_chars() -> usize { crate::middleware::validator::DEFAULT_MAX_INPUT_CHARS }
fn default_co2_per_kwh() -> f64 { 0.4 }
fn default_energy_per_token() -> f64 { 0.000002 }
fn default_model_energy() -> IndexMap<String, f64> {
    let mut table = IndexMap::new();
    table.insert("gpt-3.5-turbo".to_string(), 0.000002);
    table.insert("gpt-4o".to_string(), 0.000003);
    table
}
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            max_body_size_kb: default_max_body_size(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: default_api_key(),
            timeout_secs: default_timeout(),
            max_output_tokens: default_max_output_tokens(),
            default_model: default_model(),
            allowed_models: default_allowed_models(),
            cache_enabled: false,
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            stopwords_path: default_stopwords_path(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            co2_per_kwh: default_co2_per_kwh(),
            reporting_energy_per_token: default_energy_per_token(),
            model_energy_per_token: default_model_energy(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CompletionConfig {
    /// Whether a provider key is available
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let config = loader::load_config_with_env(path)?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// Validate this configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_config(self)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            completion: CompletionConfig::default(),
            optimizer: OptimizerConfig::default(),
            accounting: AccountingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Custom serializer for Secret<String>
fn serialize_secret<S>(secret: &Secret<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(secret.expose_secret())
}

/// Custom deserializer for Secret<String>
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Secret<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Secret::new(s))
}
