use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use webstash_core::dataset::{DatasetLimits, DEFAULT_MAX_CONTENT_CHARS, DEFAULT_MAX_ITEMS};
use webstash_core::session::{
    SessionSettings, DEFAULT_MAX_TOP_K, DEFAULT_OUTPUT_LANGUAGE, DEFAULT_TEMPERATURE,
    DEFAULT_TOP_K, DEFAULT_TOP_K_CAP, MAX_TEMPERATURE,
};
use webstash_core::store::DEFAULT_STORAGE_KEY;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            storage_key: default_storage_key(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/stash.sqlite")
}
fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}
fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}

impl DatasetConfig {
    pub fn limits(&self) -> DatasetLimits {
        DatasetLimits {
            max_items: self.max_items,
            max_content_chars: self.max_content_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_k_cap")]
    pub top_k_cap: u32,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: u32,
    #[serde(default = "default_output_language")]
    pub output_language: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            url: None,
            timeout_secs: default_timeout_secs(),
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_k_cap: DEFAULT_TOP_K_CAP,
            max_top_k: DEFAULT_MAX_TOP_K,
            output_language: default_output_language(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> Option<String> {
    Some("llama3.2".to_string())
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}
fn default_top_k_cap() -> u32 {
    DEFAULT_TOP_K_CAP
}
fn default_max_top_k() -> u32 {
    DEFAULT_MAX_TOP_K
}
fn default_output_language() -> String {
    DEFAULT_OUTPUT_LANGUAGE.to_string()
}

impl ModelConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn base_url(&self) -> &str {
        self.url.as_deref().unwrap_or("http://localhost:11434")
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            temperature: self.temperature,
            top_k: self.top_k,
            top_k_cap: self.top_k_cap,
            max_top_k: self.max_top_k,
            output_language: self.output_language.clone(),
        }
    }
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load and validate the config at `path`.
///
/// A missing file yields [`Config::minimal`]; an unreadable or invalid
/// file is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file; using defaults");
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.storage_key.trim().is_empty() {
        anyhow::bail!("db.storage_key must not be empty");
    }

    // Validate dataset
    if config.dataset.max_items == 0 {
        anyhow::bail!("dataset.max_items must be > 0");
    }
    if config.dataset.max_content_chars == 0 {
        anyhow::bail!("dataset.max_content_chars must be > 0");
    }

    // Validate model
    if !(0.0..=MAX_TEMPERATURE).contains(&config.model.temperature) {
        anyhow::bail!("model.temperature must be in [0.0, {:.1}]", MAX_TEMPERATURE);
    }
    if config.model.top_k_cap == 0 {
        anyhow::bail!("model.top_k_cap must be >= 1");
    }
    if config.model.max_top_k == 0 {
        anyhow::bail!("model.max_top_k must be >= 1");
    }

    match config.model.provider.as_str() {
        "disabled" => {}
        "ollama" => {
            if config.model.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
                anyhow::bail!("model.model must be specified when provider is 'ollama'");
            }
        }
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }

    Ok(())
}
