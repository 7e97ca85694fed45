//! Generative AI client used for verdicts and screenshot captions

use crate::config::GeminiConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Prompt sent alongside every screenshot
pub const CAPTION_PROMPT: &str = "What is this image?";

/// Text generation constrained to JSON output
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a prompt and return the raw response text.
    async fn generate_json(&self, prompt: &str) -> Result<String>;
}

/// Image understanding for screenshot captions
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    /// Download the image at `url` and describe it.
    async fn describe_image(&self, url: &str) -> Result<String>;
}

/// Client for the `generateContent` REST endpoint
pub struct GeminiClient {
    http: Client,
    api_key: String,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client; fails when no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .context("GEMINI_API_KEY is not set")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            analysis_model = %config.analysis_model,
            caption_model = %config.caption_model,
            "Generative AI client initialized"
        );

        Ok(Self {
            http,
            api_key,
            config: config.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(&self, model: &str, body: &Value) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", model))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        if !status.is_success() {
            anyhow::bail!("{} request failed status={} body={}", model, status, text);
        }

        let value: Value = serde_json::from_str(&text).context("Response is not JSON")?;
        let content = extract_candidate_text(&value)
            .with_context(|| format!("{} response missing content", model))?;

        debug!(model = %model, response_len = content.len(), "Generation complete");
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String> {
        let body = analysis_request(prompt, self.config.temperature);
        self.generate(&self.config.analysis_model, &body).await
    }
}

#[async_trait]
impl ImageDescriber for GeminiClient {
    async fn describe_image(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Failed to download image {}", url))?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .context("Failed to read image bytes")?;

        let body = caption_request(&bytes, &mime_type);
        self.generate(&self.config.caption_model, &body).await
    }
}

/// Request body for a JSON-constrained analysis call
pub fn analysis_request(prompt: &str, temperature: f64) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": prompt }]
            }
        ],
        "generationConfig": {
            "temperature": temperature,
            "responseMimeType": "application/json"
        }
    })
}

/// Request body captioning one inline image
pub fn caption_request(image: &[u8], mime_type: &str) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    { "text": CAPTION_PROMPT },
                    {
                        "inlineData": {
                            "mimeType": mime_type,
                            "data": general_purpose::STANDARD.encode(image)
                        }
                    }
                ]
            }
        ]
    })
}

/// Concatenate the text parts of the first candidate.
pub fn extract_candidate_text(value: &Value) -> Option<String> {
    let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
