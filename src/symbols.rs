//! Symbol resolution
//!
//! Maps free-text coin references ("bitcoin", "بیت کوین", "btcusdt") to a
//! canonical uppercase symbol. The alias table is an immutable snapshot;
//! a refresh builds a new one and swaps it in.

use crate::market::{MarketDataSource, REFRESH_TIMEOUT};
use crate::models::Market;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const ZERO_WIDTH_NON_JOINER: char = '\u{200C}';

/// Lowercase and strip spaces and zero-width non-joiners.
///
/// Alias keys and lookup text must go through the same function or
/// substring matching silently fails.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != ZERO_WIDTH_NON_JOINER)
        .collect()
}

/// Immutable alias → symbol table.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    aliases: HashMap<String, String>,
    /// Keys sorted longest first, ties lexicographic.
    scan_order: Vec<String>,
}

impl AliasMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut aliases = HashMap::new();
        for (alias, symbol) in pairs {
            let key = normalize(alias.as_ref());
            if key.is_empty() {
                continue;
            }
            aliases.insert(key, symbol.as_ref().to_uppercase());
        }
        Self::with_aliases(aliases)
    }

    /// Index every market under its base asset, English and Farsi names
    /// and trading symbol.
    pub fn from_markets(markets: &[Market]) -> Self {
        let mut aliases = HashMap::new();

        for market in markets {
            let base_asset = trimmed(&market.base_asset);
            if base_asset.is_empty() {
                continue;
            }
            let canonical = base_asset.to_uppercase();

            // Normalizing the Farsi name also covers its joiner-free spelling.
            let candidates = [
                base_asset,
                trimmed(&market.en_base_asset),
                trimmed(&market.fa_base_asset),
                trimmed(&market.symbol),
            ];

            for alias in candidates {
                let key = normalize(alias);
                if !key.is_empty() {
                    aliases.insert(key, canonical.clone());
                }
            }
        }

        Self::with_aliases(aliases)
    }

    fn with_aliases(aliases: HashMap<String, String>) -> Self {
        let mut scan_order: Vec<String> = aliases.keys().cloned().collect();
        // Longest first so "ethereum" wins over "eth". Length is in characters:
        // a Farsi letter takes two bytes and must not outrank a longer Latin name.
        scan_order.sort_by_cached_key(|alias| {
            (std::cmp::Reverse(alias.chars().count()), alias.clone())
        });
        Self { aliases, scan_order }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(&normalize(alias)).map(String::as_str)
    }

    /// Find the canonical symbol of the longest alias contained in `text`.
    pub fn extract(&self, text: &str) -> Option<String> {
        let haystack = normalize(text);

        for alias in &self.scan_order {
            if haystack.contains(alias.as_str()) {
                let symbol = self.aliases.get(alias)?;
                info!("Map-based extraction found symbol: {} via match: '{}'", symbol, alias);
                return Some(symbol.clone());
            }
        }

        debug!("No alias matched query: '{}'", text);
        None
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

/// Owns the current alias snapshot and the source used to rebuild it.
pub struct SymbolResolver {
    source: Arc<dyn MarketDataSource>,
    snapshot: RwLock<Arc<AliasMap>>,
}

impl SymbolResolver {
    /// Start with an empty table; call [`SymbolResolver::refresh`] to populate it.
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(AliasMap::default())),
        }
    }

    pub fn with_snapshot(source: Arc<dyn MarketDataSource>, aliases: AliasMap) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(aliases)),
        }
    }

    /// Current table. Hold on to it for the whole query.
    pub async fn snapshot(&self) -> Arc<AliasMap> {
        self.snapshot.read().await.clone()
    }

    pub async fn extract(&self, text: &str) -> Option<String> {
        self.snapshot().await.extract(text)
    }

    /// Rebuild the alias table from fresh market data.
    ///
    /// On failure the previous table stays in place and `false` is returned.
    pub async fn refresh(&self) -> bool {
        info!("Initializing coin map from market data API...");

        let markets = match self.source.fetch_markets(REFRESH_TIMEOUT).await {
            Ok(markets) => markets,
            Err(e) => {
                error!("Failed to refresh coin map: {}", e);
                return false;
            }
        };

        let aliases = Arc::new(AliasMap::from_markets(&markets));
        let count = aliases.len();
        *self.snapshot.write().await = aliases;

        info!("Successfully loaded {} coin names/symbols into the map.", count);
        true
    }
}

/// Periodically rebuild the alias table in the background.
pub fn spawn_refresh_loop(resolver: Arc<SymbolResolver>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; start-up already refreshed.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !resolver.refresh().await {
                warn!("Scheduled coin map refresh failed; keeping previous map");
            }
        }
    })
}
