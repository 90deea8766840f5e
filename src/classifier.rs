//! Intent Classifier
//!
//! Classifies a user message as either:
//! - Price: an explicit request for the current market value of an asset ("how much is BTC?")
//! - Research: everything else ("what is Solana?", news, history, definitions)
//!
//! and detects whether it is written in English or Farsi.

use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::{Classification, Intent, Language};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Raw classifier output. Both fields are required; anything else is ignored.
#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    language: String,
}

pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
    model: String,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
        }
    }

    /// Classify intent and language. Never fails: any problem yields
    /// `(research, en)`.
    pub async fn classify(&self, text: &str) -> Classification {
        info!("Using LLM to classify query type and language.");

        let request = GenerationRequest::new(&self.model, build_prompt(text)).deterministic_json();

        let raw = match self.generator.generate(request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    "Error calling LLM for classification: {}. Defaulting to ('research', 'en').",
                    e
                );
                return Classification::FALLBACK;
            }
        };

        let classification = parse_classification(&raw);
        info!(
            "LLM classified query as (Intent: '{}', Language: '{}').",
            classification.intent, classification.language
        );
        classification
    }
}

/// Validate the classifier's JSON reply.
///
/// Unparseable output or missing fields give the fallback; an intent other
/// than price/research becomes research, a language other than en/fa becomes en.
pub fn parse_classification(raw: &str) -> Classification {
    let parsed: RawClassification = match serde_json::from_str(raw.trim()) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(
                "Failed to parse LLM JSON response: {}. Error: {}. Defaulting to ('research', 'en').",
                raw, e
            );
            return Classification::FALLBACK;
        }
    };

    let intent = match parsed.intent.trim().to_lowercase().as_str() {
        "price" => Intent::Price,
        "research" => Intent::Research,
        other => {
            warn!("LLM returned invalid intent: '{}'. Defaulting to 'research'.", other);
            Intent::Research
        }
    };

    let language = Language::from_tag(&parsed.language).unwrap_or_else(|| {
        warn!(
            "LLM returned unsupported language: '{}'. Defaulting to 'en'.",
            parsed.language
        );
        Language::En
    });

    Classification { intent, language }
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"Analyze the user query below. Classify its intent ('price' or 'research') AND identify its primary language ('en' for English, 'fa' for Farsi, or 'other').

'price': Use this if the user is explicitly asking for the current market value, cost, or price of a specific cryptocurrency (e.g., "how much is BTC?", "قیمت اتریوم؟").
'research': Use this for all other questions, including general crypto questions, news, historical data, or definitions (e.g., "what is Solana?", "NFT چیست؟").

Your response MUST be a single, valid JSON object in the format:
{{"intent": "...", "language": "..."}}

User Query: "{}"

Response:"#,
        text
    )
}
