//! Market data source
//!
//! Both the symbol resolver and the price aggregator read the same
//! markets endpoint; they only differ in how long they are willing to wait.

use crate::error::BotError;
use crate::models::Market;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Timeout used when rebuilding the alias table.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout used when answering a price question.
pub const PRICE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch every market currently listed.
    ///
    /// Network and HTTP failures are `BotError::Transport`; an unexpected
    /// body is `BotError::Parse`.
    async fn fetch_markets(&self, timeout: Duration) -> crate::Result<Vec<Market>>;
}

/// Wallex public markets endpoint.
pub struct WallexClient {
    client: Client,
    url: String,
}

impl WallexClient {
    pub fn new(url: impl Into<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl MarketDataSource for WallexClient {
    async fn fetch_markets(&self, timeout: Duration) -> crate::Result<Vec<Market>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("Wallex API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Transport(format!("Wallex API returned {}", status)));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| BotError::from_reqwest("Wallex API body", e))?;

        parse_markets(&body)
    }
}

/// Pull `result.markets` out of a markets payload.
///
/// Entries that are not objects are skipped; a missing or non-list
/// `markets` field is a parse error.
pub fn parse_markets(body: &Value) -> crate::Result<Vec<Market>> {
    let markets = body
        .get("result")
        .and_then(|r| r.get("markets"))
        .ok_or_else(|| BotError::Parse("response has no result.markets".to_string()))?;

    let entries = markets.as_array().ok_or_else(|| {
        BotError::Parse(format!(
            "result.markets is not a list (got {})",
            json_kind(markets)
        ))
    })?;

    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            warn!("Skipping market entry that is not an object: {}", entry);
            continue;
        }
        match serde_json::from_value::<Market>(entry.clone()) {
            Ok(market) => out.push(market),
            Err(e) => warn!("Skipping malformed market entry: {}", e),
        }
    }

    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
