//! In-memory capability doubles for unit tests.

use crate::error::BotError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::market::MarketDataSource;
use crate::models::{Market, OrganicResult};
use crate::search::{PageFetcher, WebSearch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub fn market(base: &str, symbol: &str, quote: &str, price: &str) -> Market {
    let some = |s: &str| (!s.is_empty()).then(|| s.to_string());
    Market {
        symbol: some(symbol),
        base_asset: some(base),
        fa_base_asset: None,
        en_base_asset: None,
        quote_asset: some(quote),
        price: some(price),
    }
}

pub fn organic(title: &str, link: &str, snippet: &str) -> OrganicResult {
    OrganicResult {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        snippet: Some(snippet.to_string()),
    }
}

#[derive(Clone, Copy)]
enum Failure {
    Transport,
    Parse,
}

fn failure_error(failure: Failure) -> BotError {
    match failure {
        Failure::Transport => BotError::Transport("connection refused".to_string()),
        Failure::Parse => BotError::Parse("unexpected body".to_string()),
    }
}

pub struct StaticMarkets {
    markets: Vec<Market>,
    failure: Option<Failure>,
}

impl StaticMarkets {
    pub fn new(markets: Vec<Market>) -> Self {
        Self { markets, failure: None }
    }

    pub fn failing_transport() -> Self {
        Self { markets: vec![], failure: Some(Failure::Transport) }
    }

    pub fn failing_parse() -> Self {
        Self { markets: vec![], failure: Some(Failure::Parse) }
    }
}

#[async_trait]
impl MarketDataSource for StaticMarkets {
    async fn fetch_markets(&self, _timeout: Duration) -> crate::Result<Vec<Market>> {
        match self.failure {
            Some(failure) => Err(failure_error(failure)),
            None => Ok(self.markets.clone()),
        }
    }
}

/// Replies with canned text per model and records every request.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: HashMap<String, String>,
    fail: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn reply(mut self, model: &str, text: &str) -> Self {
        self.replies.insert(model.to_string(), text.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> crate::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(BotError::Transport("LLM runtime unreachable".to_string()));
        }
        self.replies
            .get(&request.model)
            .cloned()
            .ok_or_else(|| BotError::Llm(format!("no scripted reply for {}", request.model)))
    }
}

pub struct StaticSearch {
    results: Vec<OrganicResult>,
    configured: bool,
    fail: bool,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl StaticSearch {
    pub fn new(results: Vec<OrganicResult>) -> Self {
        Self { results, configured: true, fail: false, queries: Mutex::new(vec![]) }
    }

    pub fn unconfigured() -> Self {
        Self { configured: false, ..Self::new(vec![]) }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new(vec![]) }
    }
}

#[async_trait]
impl WebSearch for StaticSearch {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn search(&self, query: &str, language_hint: &str) -> crate::Result<Vec<OrganicResult>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), language_hint.to_string()));
        if self.fail {
            return Err(BotError::Transport("search timed out".to_string()));
        }
        Ok(self.results.clone())
    }
}

/// Serves HTML per URL; unknown URLs fail like a dead host.
#[derive(Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticPages {
    async fn fetch(&self, url: &str) -> crate::Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| BotError::Transport(format!("failed to fetch {}", url)))
    }
}
