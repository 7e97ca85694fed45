//! HTTP client for a google-play-api compatible REST service

use super::{ReviewQuery, StoreClient};
use crate::config::StoreConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

pub struct StoreApiClient {
    http: Client,
    config: StoreConfig,
}

impl StoreApiClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);
        debug!(url = %url, "Store request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Store request to {} failed", url))?;

        let status = response.status();
        let body = response.text().await.context("Failed to read store response")?;
        if !status.is_success() {
            anyhow::bail!("store request failed status={} body={}", status, body);
        }
        serde_json::from_str(&body).context("Store response is not JSON")
    }

    /// Query string of one review page. The star filter travels as
    /// `filterScoreWith`, the option name of google-play-scraper.
    fn review_params(&self, query: ReviewQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort", query.sort.code().to_string()),
            ("num", query.count.to_string()),
        ];
        params.extend(self.locale());
        if let Some(score) = query.score {
            params.push(("filterScoreWith", score.to_string()));
        }
        params
    }

    fn locale(&self) -> [(&'static str, String); 2] {
        [
            ("lang", self.config.lang.clone()),
            ("country", self.config.country.clone()),
        ]
    }
}

#[async_trait]
impl StoreClient for StoreApiClient {
    async fn search(&self, query: &str, country: &str, hits: usize) -> Result<Vec<Value>> {
        let params = [
            ("q", query.to_string()),
            ("num", hits.to_string()),
            ("lang", self.config.lang.clone()),
            ("country", country.to_string()),
        ];
        let value = self.get_json("apps/", &params).await?;
        Ok(into_list(value, &["results", "data"]))
    }

    async fn app_details(&self, app_id: &str) -> Result<Map<String, Value>> {
        let value = self
            .get_json(&format!("apps/{}/", app_id), &self.locale())
            .await?;
        match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("unexpected details payload for {}: {}", app_id, other),
        }
    }

    async fn reviews(&self, app_id: &str, query: ReviewQuery) -> Result<Vec<Value>> {
        let params = self.review_params(query);
        let value = self
            .get_json(&format!("apps/{}/reviews/", app_id), &params)
            .await?;
        Ok(into_list(value, &["data", "results"]))
    }

    async fn permissions(&self, app_id: &str) -> Result<Value> {
        let value = self
            .get_json(&format!("apps/{}/permissions/", app_id), &self.locale())
            .await?;
        Ok(match value {
            Value::Object(mut map) if map.contains_key("results") => {
                map.remove("results").unwrap_or(Value::Null)
            }
            other => other,
        })
    }
}

/// A list payload, either bare or nested (possibly twice) under one of `keys`.
fn into_list(value: Value, keys: &[&str]) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => keys
            .iter()
            .find_map(|key| map.remove(*key))
            .map(|inner| into_list(inner, keys))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
