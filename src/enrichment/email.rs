//! Developer email validation against a mailboxlayer-style API

use crate::types::NOT_AVAILABLE;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Best-effort email check. Without an access key every lookup is skipped.
pub struct EmailValidator {
    http: Client,
    base_url: String,
    access_key: Option<String>,
}

impl EmailValidator {
    pub fn new(http: Client, base_url: &str, access_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.access_key.is_some()
    }

    /// Validation details for `email`; empty when disabled or on any failure.
    pub async fn validate(&self, email: &str) -> Map<String, Value> {
        let Some(access_key) = &self.access_key else {
            return Map::new();
        };
        let email = email.trim();
        if email.is_empty() || email == NOT_AVAILABLE {
            return Map::new();
        }

        match self.lookup(access_key, email).await {
            Ok(details) => details,
            Err(e) => {
                warn!(email = %email, error = %format!("{:#}", e), "Email validation failed");
                Map::new()
            }
        }
    }

    async fn lookup(&self, access_key: &str, email: &str) -> Result<Map<String, Value>> {
        let value: Value = self
            .http
            .get(format!("{}/check", self.base_url))
            .query(&[("access_key", access_key), ("email", email)])
            .send()
            .await
            .context("Email validation request failed")?
            .json()
            .await
            .context("Email validation response is not JSON")?;

        let details = interpret_response(value)?;
        debug!(email = %email, fields = details.len(), "Email validated");
        Ok(details)
    }
}

/// Reject error payloads (`{"success": false, "error": {...}}`).
fn interpret_response(value: Value) -> Result<Map<String, Value>> {
    let Value::Object(map) = value else {
        anyhow::bail!("unexpected email validation payload");
    };
    if let Some(error) = map.get("error") {
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        anyhow::bail!("email service error: {}", info);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_without_key() {
        let validator = EmailValidator::new(Client::new(), "https://apilayer.net/api", None);
        assert!(!validator.is_enabled());
        assert!(validator.validate("dev@example.com").await.is_empty());

        let blank =
            EmailValidator::new(Client::new(), "https://apilayer.net/api", Some(" ".into()));
        assert!(!blank.is_enabled());
    }

    #[test]
    fn test_error_payload_rejected() {
        let payload = json!({"success": false, "error": {"code": 104, "info": "quota reached"}});
        let err = interpret_response(payload).unwrap_err();
        assert!(err.to_string().contains("quota reached"));
    }

    #[test]
    fn test_success_payload_kept() {
        let payload = json!({
            "email": "dev@example.com",
            "format_valid": true,
            "smtp_check": false
        });
        let details = interpret_response(payload).unwrap();
        assert_eq!(details["format_valid"], true);
        assert_eq!(details.len(), 3);
    }
}
