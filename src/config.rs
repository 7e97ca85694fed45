//! Configuration management for the analysis pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub store: StoreConfig,
    pub enrichment: EnrichmentConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Generative AI endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the generative language API
    pub base_url: String,
    /// Model used for the text analysis calls
    pub analysis_model: String,
    /// Model used to caption screenshots
    pub caption_model: String,
    pub temperature: f64,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Falls back to `GEMINI_API_KEY`
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            analysis_model: "gemini-2.0-flash".to_string(),
            caption_model: "gemini-2.0-flash-lite".to_string(),
            temperature: 0.5,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Store data API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of a google-play-api compatible REST service
    pub base_url: String,
    pub lang: String,
    pub country: String,
    /// Number of search hits turned into app ids
    pub search_hits: usize,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            search_hits: 10,
            timeout_secs: 30,
        }
    }
}

/// Enrichment configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Screenshots captioned per app
    pub screenshot_limit: usize,
    /// Pause before each caption call, in milliseconds
    pub screenshot_delay_ms: u64,
    /// Review budget per app
    pub review_count: usize,
    /// Characters kept from a rendered website
    pub website_char_limit: usize,
    /// Tokens kept from an extraction-service markdown page
    pub website_token_limit: usize,
    pub email_base_url: String,
    /// Falls back to `MAIL_API_KEY`; email validation is skipped without one
    pub email_api_key: Option<String>,
    pub firecrawl_base_url: String,
    /// Falls back to `FIRECRAWL_API_KEY`
    pub firecrawl_api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            screenshot_limit: 5,
            screenshot_delay_ms: 1000,
            review_count: 100,
            website_char_limit: 2000,
            website_token_limit: 2000,
            email_base_url: "https://apilayer.net/api".to_string(),
            email_api_key: None,
            firecrawl_base_url: "https://api.firecrawl.dev".to_string(),
            firecrawl_api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Analysis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Token budget for the developer and review prompts
    pub prompt_token_limit: usize,
    /// Tokenizer model used for truncation
    pub tokenizer_model: String,
    /// Maximum characters kept from a verdict reason
    pub reason_char_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            prompt_token_limit: 8000,
            tokenizer_model: "gpt-4".to_string(),
            reason_char_limit: 300,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional; `FRAUDSCAN__<SECTION>__<KEY>` variables override
    /// it, and API keys fall back to their conventional variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("FRAUDSCAN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.apply_env_secrets();
        Ok(config)
    }

    fn apply_env_secrets(&mut self) {
        fill_from_env(&mut self.gemini.api_key, "GEMINI_API_KEY");
        fill_from_env(&mut self.enrichment.firecrawl_api_key, "FIRECRAWL_API_KEY");
        fill_from_env(&mut self.enrichment.email_api_key, "MAIL_API_KEY");
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.as_deref().map_or(true, |key| key.trim().is_empty()) {
        *slot = std::env::var(var).ok().filter(|key| !key.trim().is_empty());
    }
}
