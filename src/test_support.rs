//! In-memory stand-ins for the external services, shared by unit tests

use crate::models::gemini::{ImageDescriber, TextGenerator};
use crate::store::{ReviewQuery, StoreClient};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Mutex;

enum Reply {
    Text(String),
    Fail,
}

/// Text generator answering by prompt substring, first matching rule wins.
pub struct ScriptedGenerator {
    default: String,
    rules: Vec<(String, Reply)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(default: &str) -> Self {
        Self {
            default: default.to_string(),
            rules: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(response.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        for (needle, reply) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return match reply {
                    Reply::Text(text) => Ok(text.clone()),
                    Reply::Fail => anyhow::bail!("scripted failure for '{}'", needle),
                };
            }
        }
        Ok(self.default.clone())
    }
}

/// Image describer echoing the URL, failing for selected URLs.
pub struct FakeDescriber {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeDescriber {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageDescriber for FakeDescriber {
    async fn describe_image(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            anyhow::bail!("could not download {}", url);
        }
        Ok(format!("caption of {}", url))
    }
}

/// Store with a fixed catalogue, synthetic reviews and permissions.
pub struct FakeStore {
    apps: Vec<(String, Value)>,
    failing_details: HashSet<String>,
    failing_reviews: HashSet<String>,
    failing_permissions: HashSet<String>,
    review_queries: Mutex<Vec<ReviewQuery>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            apps: Vec::new(),
            failing_details: HashSet::new(),
            failing_reviews: HashSet::new(),
            failing_permissions: HashSet::new(),
            review_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_app(mut self, app_id: &str, details: Value) -> Self {
        self.apps.push((app_id.to_string(), details));
        self
    }

    pub fn failing_details(mut self, app_id: &str) -> Self {
        self.failing_details.insert(app_id.to_string());
        self
    }

    pub fn failing_reviews(mut self, app_id: &str) -> Self {
        self.failing_reviews.insert(app_id.to_string());
        self
    }

    pub fn failing_permissions(mut self, app_id: &str) -> Self {
        self.failing_permissions.insert(app_id.to_string());
        self
    }

    pub fn review_queries(&self) -> Vec<ReviewQuery> {
        self.review_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn search(&self, _query: &str, _country: &str, hits: usize) -> Result<Vec<Value>> {
        Ok(self
            .apps
            .iter()
            .take(hits)
            .map(|(app_id, _)| json!({ "appId": app_id }))
            .collect())
    }

    async fn app_details(&self, app_id: &str) -> Result<Map<String, Value>> {
        if self.failing_details.contains(app_id) {
            anyhow::bail!("details unavailable for {}", app_id);
        }
        let details = self
            .apps
            .iter()
            .find(|(id, _)| id == app_id)
            .and_then(|(_, details)| details.as_object().cloned())
            .ok_or_else(|| anyhow::anyhow!("unknown app {}", app_id))?;
        Ok(details)
    }

    async fn reviews(&self, app_id: &str, query: ReviewQuery) -> Result<Vec<Value>> {
        self.review_queries.lock().unwrap().push(query);
        if self.failing_reviews.contains(app_id) {
            anyhow::bail!("reviews unavailable for {}", app_id);
        }
        Ok((0..query.count)
            .map(|i| {
                json!({
                    "reviewId": format!("r{}", i),
                    "userName": format!("user{}", i),
                    "content": "Works as advertised",
                    "score": query.score.unwrap_or(4),
                    "thumbsUpCount": i,
                    "replyText": null
                })
            })
            .collect())
    }

    async fn permissions(&self, app_id: &str) -> Result<Value> {
        if self.failing_permissions.contains(app_id) {
            anyhow::bail!("permissions unavailable for {}", app_id);
        }
        Ok(json!([
            {"permission": "approximate location", "type": "Location"},
            {"permission": "full network access", "type": "Network"}
        ]))
    }
}
