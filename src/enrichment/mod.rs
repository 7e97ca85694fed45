//! Enrichment of collected listings before analysis

pub mod email;
pub mod website;

pub use email::EmailValidator;
pub use website::WebsiteScraper;

use crate::config::EnrichmentConfig;
use crate::models::gemini::ImageDescriber;
use crate::store::Collector;
use crate::types::{AppInfo, Permissions, Screenshots};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Adds permissions, reviews, email validity, website text and screenshot
/// captions to a collected listing.
pub struct Enricher {
    collector: Collector,
    describer: Arc<dyn ImageDescriber>,
    email: EmailValidator,
    website: WebsiteScraper,
    screenshot_limit: usize,
    screenshot_delay: Duration,
    review_count: usize,
}

impl Enricher {
    pub fn new(
        collector: Collector,
        describer: Arc<dyn ImageDescriber>,
        email: EmailValidator,
        website: WebsiteScraper,
        config: &EnrichmentConfig,
    ) -> Self {
        Self {
            collector,
            describer,
            email,
            website,
            screenshot_limit: config.screenshot_limit,
            screenshot_delay: Duration::from_millis(config.screenshot_delay_ms),
            review_count: config.review_count,
        }
    }

    /// Build the enricher's HTTP-backed helpers from configuration.
    pub fn from_config(
        collector: Collector,
        describer: Arc<dyn ImageDescriber>,
        config: &EnrichmentConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let email = EmailValidator::new(
            http.clone(),
            &config.email_base_url,
            config.email_api_key.clone(),
        );
        let website = WebsiteScraper::new(
            http,
            config.website_char_limit,
            config.website_token_limit,
        )
        .with_firecrawl(&config.firecrawl_base_url, config.firecrawl_api_key.clone());

        info!(
            email_validation = email.is_enabled(),
            screenshot_limit = config.screenshot_limit,
            "Enricher initialized"
        );
        Ok(Self::new(collector, describer, email, website, config))
    }

    /// Enrich one listing.
    ///
    /// Every lookup failure degrades to an empty value; only a listing
    /// without an app id is rejected.
    pub async fn add_info(&self, mut app: AppInfo) -> Result<AppInfo> {
        if app.app_id.trim().is_empty() {
            anyhow::bail!("Cannot enrich a listing without an app id");
        }
        self.describe_screenshots(&mut app).await;

        let permissions = match self.collector.get_permissions(&app.app_id).await {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(app_id = %app.app_id, error = %format!("{:#}", e), "Permissions unavailable");
                Permissions::new()
            }
        };
        let reviews = match self.collector.get_reviews(&app.app_id, self.review_count).await {
            Ok(reviews) => reviews,
            Err(e) => {
                warn!(app_id = %app.app_id, error = %format!("{:#}", e), "Reviews unavailable");
                Vec::new()
            }
        };

        app.permissions = Some(permissions);
        app.reviews = Some(reviews);

        let email_valid = self.email.validate(&app.developer.email).await;
        if !email_valid.is_empty() {
            app.email_valid = Some(email_valid);
        }

        if let Some(website) = app.developer.website_url().map(str::to_string) {
            app.website_content = Some(self.website.scrape(&website).await);
        }

        debug!(app_id = %app.app_id, "Enrichment complete");
        Ok(app)
    }

    /// Caption the first screenshots; the rest move to `otherScreenshots`.
    pub async fn describe_screenshots(&self, app: &mut AppInfo) {
        let urls = app.media.screenshots.urls();
        let split = self.screenshot_limit.min(urls.len());
        let (to_describe, remaining) = urls.split_at(split);

        let mut captions = Map::new();
        for url in to_describe {
            tokio::time::sleep(self.screenshot_delay).await;
            match self.describer.describe_image(url).await {
                Ok(caption) => {
                    debug!(app_id = %app.app_id, url = %url, "Screenshot described");
                    captions.insert(url.clone(), Value::String(caption));
                }
                Err(e) => {
                    warn!(
                        app_id = %app.app_id,
                        url = %url,
                        error = %format!("{:#}", e),
                        "Error describing screenshot"
                    );
                }
            }
        }

        info!(
            app_id = %app.app_id,
            described = captions.len(),
            skipped = remaining.len(),
            "Screenshots processed"
        );
        app.media.screenshots = Screenshots::Described(captions);
        app.media.other_screenshots = remaining.to_vec();
    }
}
