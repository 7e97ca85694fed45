//! Developer website text extraction with a markdown-service fallback

use crate::tokens::TokenBudget;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Scrapes the visible text of a developer website.
///
/// The page is fetched and reduced to text first; when that yields nothing
/// and a Firecrawl key is configured, the extraction service is asked for
/// markdown instead.
pub struct WebsiteScraper {
    http: Client,
    char_limit: usize,
    token_limit: usize,
    tokens: TokenBudget,
    firecrawl: Option<FirecrawlSettings>,
}

struct FirecrawlSettings {
    base_url: String,
    api_key: String,
}

impl WebsiteScraper {
    pub fn new(http: Client, char_limit: usize, token_limit: usize) -> Self {
        Self {
            http,
            char_limit,
            token_limit,
            tokens: TokenBudget::default(),
            firecrawl: None,
        }
    }

    /// Enable the extraction-service fallback.
    pub fn with_firecrawl(mut self, base_url: &str, api_key: Option<String>) -> Self {
        self.firecrawl = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| FirecrawlSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            });
        self
    }

    /// Website text; empty when every strategy fails.
    pub async fn scrape(&self, url: &str) -> String {
        match self.render(url).await {
            Ok(text) if !text.is_empty() => return text,
            Ok(_) => debug!(url = %url, "Rendered page has no text"),
            Err(e) => warn!(url = %url, error = %format!("{:#}", e), "Page fetch failed"),
        }

        if self.firecrawl.is_some() {
            match self.firecrawl(url).await {
                Ok(markdown) => return markdown,
                Err(e) => warn!(url = %url, error = %format!("{:#}", e), "Firecrawl scrape failed"),
            }
        }

        String::new()
    }

    async fn render(&self, url: &str) -> Result<String> {
        let html = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("Failed to fetch {}", url))?
            .text()
            .await
            .context("Failed to read page body")?;

        extract_text(&html, self.char_limit)
    }

    async fn firecrawl(&self, url: &str) -> Result<String> {
        let Some(settings) = &self.firecrawl else {
            anyhow::bail!("Firecrawl is not configured");
        };

        let value: Value = self
            .http
            .post(format!("{}/v1/scrape", settings.base_url))
            .bearer_auth(&settings.api_key)
            .json(&json!({ "url": url, "formats": ["markdown"] }))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .context("Firecrawl request failed")?
            .json()
            .await
            .context("Firecrawl response is not JSON")?;

        let markdown = value
            .pointer("/data/markdown")
            .or_else(|| value.get("markdown"))
            .and_then(Value::as_str)
            .context("Firecrawl response missing markdown")?;

        Ok(self.tokens.truncate(markdown, self.token_limit))
    }
}

/// Visible text of an HTML page: scripts, styles and comments dropped, tags
/// stripped, common entities decoded, whitespace collapsed, then cut to
/// `char_limit` characters.
pub fn extract_text(html: &str, char_limit: usize) -> Result<String> {
    let hidden = Regex::new(
        r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<!--.*?-->",
    )
    .context("Failed to create regex")?;
    let tags = Regex::new(r"(?s)<[^>]*>").context("Failed to create regex")?;

    let text = hidden.replace_all(html, " ");
    let text = tags.replace_all(&text, " ");
    let text = decode_entities(&text);

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(char_limit).collect();
    Ok(truncated.trim().to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_strips_markup() {
        let html = r#"<html><head><title>Acme</title><style>body { color: red; }</style>
            <script>var tracking = "secret";</script></head>
            <body><!-- hidden --><h1>Acme&nbsp;Apps</h1>
            <p>We build   tools &amp; games.</p></body></html>"#;

        let text = extract_text(html, 2000).unwrap();
        assert_eq!(text, "Acme Acme Apps We build tools & games.");
    }

    #[test]
    fn test_extract_text_truncates() {
        let html = format!("<p>{}</p>", "word ".repeat(1000));
        let text = extract_text(&html, 2000).unwrap();
        assert!(text.chars().count() <= 2000);
        assert!(text.starts_with("word word"));
    }

    const UNREACHABLE: &str = "http://127.0.0.1:1/";

    #[tokio::test]
    async fn test_scrape_failure_without_firecrawl_is_empty() {
        let scraper = WebsiteScraper::new(Client::new(), 2000, 2000);
        assert_eq!(scraper.scrape(UNREACHABLE).await, "");
    }

    #[tokio::test]
    async fn test_scrape_failure_with_firecrawl_is_empty() {
        let scraper = WebsiteScraper::new(Client::new(), 2000, 2000)
            .with_firecrawl("http://127.0.0.1:1", Some("fc-key".into()));
        assert!(scraper.firecrawl.is_some());
        assert_eq!(scraper.scrape(UNREACHABLE).await, "");
    }

    #[test]
    fn test_firecrawl_requires_key() {
        let scraper = WebsiteScraper::new(Client::new(), 2000, 2000)
            .with_firecrawl("https://api.firecrawl.dev", None);
        assert!(scraper.firecrawl.is_none());

        let scraper = WebsiteScraper::new(Client::new(), 2000, 2000)
            .with_firecrawl("https://api.firecrawl.dev/", Some("fc-key".into()));
        assert_eq!(
            scraper.firecrawl.as_ref().map(|f| f.base_url.as_str()),
            Some("https://api.firecrawl.dev")
        );
    }
}
