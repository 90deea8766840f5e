//! Crypto Query Bot
//!
//! A bilingual (English / Farsi) question-answering engine that:
//! - Classifies each message as a price lookup or a research question
//! - Resolves coin names and aliases against live exchange markets
//! - Aggregates and ranks exchange quotes (TMN first, then USDT)
//! - Researches open questions via web search, scraping and LLM synthesis
//!
//! Every path ends in a reply string; failures become templated messages.
//!
//! FLOW:
//! INPUT → CLASSIFY → (PRICE | RESEARCH → SYNTHESIZE) → REPLY

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod journal;
pub mod llm;
pub mod market;
pub mod models;
pub mod pricing;
pub mod research;
pub mod search;
pub mod symbols;
pub mod telemetry;
pub mod templates;

#[cfg(test)]
mod test_support;

pub use error::{BotError, Result};

// Re-export common types
pub use agent::Orchestrator;
pub use models::*;
