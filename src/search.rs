//! Web search and page fetching
//!
//! `SerpApiClient` returns ranked Google organic results; `HttpPageFetcher`
//! downloads result pages so their paragraph text can be used as context.

use crate::error::BotError;
use crate::models::OrganicResult;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub const SERPAPI_URL: &str = "https://serpapi.com/search.json";
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(5);

const SCRAPER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Ranked web search.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// False when credentials are missing; callers must not call `search` then.
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &str, language_hint: &str) -> crate::Result<Vec<OrganicResult>>;
}

/// Raw page download.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> crate::Result<String>;
}

pub struct SerpApiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl SerpApiClient {
    pub fn new(api_key: Option<String>) -> crate::Result<Self> {
        let client = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: SERPAPI_URL.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl WebSearch for SerpApiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, language_hint: &str) -> crate::Result<Vec<OrganicResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BotError::Config("API key not configured".to_string()))?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("hl", language_hint),
                ("gl", "us"),
                ("api_key", api_key),
            ])
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("search request failed: {}", e)))?;

        let status = response.status();
        let body: SerpApiResponse = response
            .json()
            .await
            .map_err(|e| BotError::from_reqwest("search response", e))?;

        if let Some(message) = body.error.filter(|m| !m.is_empty()) {
            // SerpApi reports "no results" through the error field with 200.
            if status.is_success() && message.contains("hasn't returned any results") {
                return Ok(vec![]);
            }
            return Err(BotError::Transport(message));
        }
        if !status.is_success() {
            return Err(BotError::Transport(format!("search API returned {}", status)));
        }

        Ok(body.organic_results)
    }
}

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(SCRAPER_USER_AGENT)
            .timeout(SCRAPE_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> crate::Result<String> {
        info!("Scraping {} for context...", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Transport(format!("{} returned {}", url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(url, e))
    }
}

/// Paragraph text of an HTML document: `<p>` contents joined by newlines,
/// whitespace collapsed.
pub fn extract_paragraph_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    let joined = document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    compact_ws(&joined)
}

pub fn compact_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to `max_chars` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_paragraph_text() {
        let html = r#"
            <html><head><title>Ignored</title></head>
            <body>
              <nav>menu</nav>
              <p>Bitcoin   is a
                 decentralized currency.</p>
              <div><p>It was created in <b>2009</b>.</p></div>
            </body></html>"#;

        assert_eq!(
            extract_paragraph_text(html),
            "Bitcoin is a decentralized currency. It was created in 2009."
        );
    }

    #[test]
    fn test_extract_without_paragraphs_is_empty() {
        assert_eq!(extract_paragraph_text("<html><body><div>x</div></body></html>"), "");
        assert_eq!(extract_paragraph_text(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 10), "abcdef");
        assert_eq!(truncate_chars("abcdef", 6), "abcdef");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        // Multi-byte text is cut on character boundaries.
        assert_eq!(truncate_chars("بیت‌کوین", 3), "بیت...");
    }

    #[test]
    fn test_serpapi_response_parsing() {
        let body: SerpApiResponse = serde_json::from_str(
            r#"{"search_metadata":{"status":"Success"},
                "organic_results":[
                  {"position":1,"title":"Solana","link":"https://solana.com","snippet":"Fast chain"},
                  {"position":2,"title":"No link"}
                ]}"#,
        )
        .unwrap();

        assert_eq!(body.organic_results.len(), 2);
        assert_eq!(body.organic_results[0].link.as_deref(), Some("https://solana.com"));
        assert!(body.organic_results[1].link.is_none());
        assert!(body.error.is_none());
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let client = SerpApiClient::new(Some("  ".to_string())).unwrap();
        assert!(!client.is_configured());
        let client = SerpApiClient::new(Some("key".to_string())).unwrap();
        assert!(client.is_configured());
    }
}
