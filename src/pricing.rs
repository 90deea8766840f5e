//! Price aggregation
//!
//! Collects every market quoting a base symbol, ranks them (TMN, then USDT,
//! then the rest alphabetically) and renders a localized price list.

use crate::error::BotError;
use crate::market::{MarketDataSource, PRICE_TIMEOUT};
use crate::models::{Language, Market, MarketQuote};
use crate::templates::{render, templates};
use chrono::Local;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct PriceAggregator {
    source: Arc<dyn MarketDataSource>,
}

impl PriceAggregator {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// Localized price list for `symbol`. Failures become localized messages.
    pub async fn get_price_reply(&self, symbol: &str, language: Language) -> String {
        let t = templates(language);
        info!("Attempting to fetch all market prices for base symbol: {}", symbol);

        let markets = match self.source.fetch_markets(PRICE_TIMEOUT).await {
            Ok(markets) => markets,
            Err(e) if e.is_transport() || matches!(e, BotError::Config(_)) => {
                error!("Error calling market data API: {}", e);
                return t.price_api_error.to_string();
            }
            Err(e) => {
                error!("Error parsing market data response: {}", e);
                return t.price_parse_error.to_string();
            }
        };

        let quotes = rank_quotes(collect_quotes(&markets, symbol));
        if quotes.is_empty() {
            warn!("Symbol '{}' not found in markets.", symbol);
            return render(t.price_not_found, &[("symbol", symbol)]);
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let reply = format_price_reply(symbol, &timestamp, &quotes, language);
        info!(
            "Successfully found and compiled prices for {} across {} markets.",
            symbol,
            quotes.len()
        );
        reply
    }
}

/// Complete quotes whose base asset matches `symbol` case-insensitively.
pub fn collect_quotes(markets: &[Market], symbol: &str) -> Vec<MarketQuote> {
    let wanted = symbol.to_lowercase();

    markets
        .iter()
        .filter(|m| {
            m.base_asset
                .as_deref()
                .map(|base| base.to_lowercase() == wanted)
                .unwrap_or(false)
        })
        .filter_map(|m| {
            let price = non_empty(&m.price)?;
            let pair_symbol = non_empty(&m.symbol)?;
            let quote_asset = non_empty(&m.quote_asset)?;
            Some(MarketQuote {
                base: symbol.to_uppercase(),
                pair_symbol: pair_symbol.to_string(),
                quote_asset: quote_asset.to_string(),
                price: price.to_string(),
            })
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// TMN first, USDT second, everything else by quote asset. Stable.
pub fn rank_quotes(mut quotes: Vec<MarketQuote>) -> Vec<MarketQuote> {
    quotes.sort_by(|a, b| rank_key(a).cmp(&rank_key(b)));
    quotes
}

fn rank_key(quote: &MarketQuote) -> (bool, bool, &str) {
    let q = quote.quote_asset.as_str();
    (q != "TMN", q != "USDT", q)
}

pub fn format_price_reply(
    symbol: &str,
    timestamp: &str,
    quotes: &[MarketQuote],
    language: Language,
) -> String {
    let t = templates(language);

    let mut lines = Vec::with_capacity(quotes.len() + 1);
    lines.push(render(
        t.price_header,
        &[("symbol", symbol), ("timestamp", timestamp)],
    ));
    for quote in quotes {
        lines.push(render(
            t.price_line,
            &[
                ("quote", quote.quote_asset.as_str()),
                ("symbol", quote.pair_symbol.as_str()),
                ("price", quote.price.as_str()),
            ],
        ));
    }
    lines.join("\n")
}
