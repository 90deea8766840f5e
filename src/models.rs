//! Core data models for the crypto query bot

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Price,
    Research,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fa,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Price => "price",
            Intent::Research => "research",
        }
    }
}

impl Language {
    /// Parse a language tag. Anything other than `en`/`fa` is unsupported.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "en" => Some(Language::En),
            "fa" => Some(Language::Fa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fa => "fa",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ================= Classification =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub language: Language,
}

impl Classification {
    /// Safe default used whenever the classifier cannot be trusted.
    pub const FALLBACK: Classification = Classification {
        intent: Intent::Research,
        language: Language::En,
    };
}

impl Default for Classification {
    fn default() -> Self {
        Self::FALLBACK
    }
}

//
// ================= Market Data =================
//

/// One market as reported by the market-data API.
///
/// Every field is optional on the wire; validation happens where the
/// market is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub base_asset: Option<String>,
    #[serde(default)]
    pub fa_base_asset: Option<String>,
    #[serde(default)]
    pub en_base_asset: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default, deserialize_with = "de_price")]
    pub price: Option<String>,
}

/// Prices arrive as strings, but keep numbers verbatim too so no precision
/// is lost to float formatting.
fn de_price<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub base: String,
    pub pair_symbol: String,
    pub quote_asset: String,
    pub price: String,
}

//
// ================= Research =================
//

/// A single organic search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub link: String,
}

/// Outcome of the search-and-extract stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchOutcome {
    /// Labeled context fragments plus the sources they came from, in rank order.
    Context {
        context: String,
        sources: Vec<SearchSource>,
    },
    /// A terminal, already localized message (no results, search failure...).
    Message(String),
}

impl ResearchOutcome {
    pub fn sources(&self) -> Option<&[SearchSource]> {
        match self {
            ResearchOutcome::Context { sources, .. } => Some(sources),
            ResearchOutcome::Message(_) => None,
        }
    }
}
