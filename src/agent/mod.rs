//! Main orchestrator - turns one user message into one reply
//!
//! CLASSIFY → (PRICE | RESEARCH → SYNTHESIZE) → REPLY
//!
//! A price question whose asset cannot be resolved is answered as research.
//! Every branch ends in a displayable string.

use crate::classifier::IntentClassifier;
use crate::config::Settings;
use crate::journal::ExampleJournal;
use crate::llm::{OllamaClient, TextGenerator};
use crate::market::WallexClient;
use crate::models::{Intent, ResearchOutcome, SearchSource};
use crate::pricing::PriceAggregator;
use crate::research::ResearchPipeline;
use crate::search::{HttpPageFetcher, SerpApiClient};
use crate::symbols::SymbolResolver;
use crate::templates::{templates, UNEXPECTED_ERROR};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info};

/// Length of the reply excerpt written to the log.
const LOG_SNIPPET_CHARS: usize = 150;

/// Main orchestrator that coordinates the entire workflow
pub struct Orchestrator {
    classifier: IntentClassifier,
    symbols: Arc<SymbolResolver>,
    prices: PriceAggregator,
    research: ResearchPipeline,
    journal: ExampleJournal,
}

impl Orchestrator {
    pub fn new(
        classifier: IntentClassifier,
        symbols: Arc<SymbolResolver>,
        prices: PriceAggregator,
        research: ResearchPipeline,
        journal: ExampleJournal,
    ) -> Self {
        Self {
            classifier,
            symbols,
            prices,
            research,
            journal,
        }
    }

    /// Wire the production clients described by `settings`.
    ///
    /// When the LLM runtime does not answer at start-up, synthesis is
    /// reported as unavailable for the lifetime of this orchestrator.
    /// The alias table starts empty; call `symbols().refresh()` before serving.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let market = Arc::new(WallexClient::new(&settings.wallex_api_url)?);

        let llm = Arc::new(OllamaClient::new(&settings.ollama_host, settings.llm_timeout)?);
        let synthesizer: Option<Arc<dyn TextGenerator>> = match llm.ping().await {
            Ok(()) => {
                info!("Successfully connected to LLM runtime at {}", settings.ollama_host);
                Some(llm.clone() as Arc<dyn TextGenerator>)
            }
            Err(e) => {
                error!(
                    "Failed to connect to LLM runtime at {}. Is it running? Error: {}",
                    settings.ollama_host, e
                );
                None
            }
        };

        let search = Arc::new(SerpApiClient::new(settings.serpapi_key.clone())?);
        let pages = Arc::new(HttpPageFetcher::new()?);

        Ok(Self::new(
            IntentClassifier::new(llm, &settings.classifier_model),
            Arc::new(SymbolResolver::new(market.clone())),
            PriceAggregator::new(market),
            ResearchPipeline::new(search, pages, synthesizer, &settings.synthesis_model),
            ExampleJournal::new(&settings.example_log_file),
        ))
    }

    pub fn symbols(&self) -> &Arc<SymbolResolver> {
        &self.symbols
    }

    /// Produce the reply for one user message. Never fails.
    ///
    /// `request_id` is only used to correlate log lines.
    pub async fn generate_reply(&self, query: &str, request_id: &str) -> String {
        let start_time = Instant::now();

        // === CLASSIFY ===
        let classification = self.classifier.classify(query).await;
        let language = classification.language;
        let mut intent = classification.intent;
        let t = templates(language);

        info!(request_id, lang = %language, decision = %intent, "Query classified");

        let mut reply = String::new();

        // === PRICE ===
        if intent == Intent::Price {
            let aliases = self.symbols.snapshot().await;
            match aliases.extract(query) {
                Some(symbol) => {
                    info!(request_id, symbol = %symbol, "Extracted symbol. Fetching price.");
                    reply = self.prices.get_price_reply(&symbol, language).await;
                }
                None => {
                    info!(request_id, "Price query, but no symbol found. Switching to research.");
                    intent = Intent::Research;
                }
            }
        }

        // === RESEARCH ===
        if intent == Intent::Research {
            info!(request_id, "Performing web search.");
            reply = match self.research.research(query, language).await {
                ResearchOutcome::Context { context, sources } => {
                    info!(
                        request_id,
                        sources = sources.len(),
                        "Synthesizing answer from sources."
                    );
                    match self.research.synthesize(query, &context, language).await {
                        Some(answer) => {
                            format!("{}{}{}", answer, t.synth_sources_header, source_lines(&sources))
                        }
                        None => t.synth_api_error.to_string(),
                    }
                }
                ResearchOutcome::Message(message) => message,
            };
        }

        info!(
            request_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Generation complete. Reply snippet: {}...",
            reply.chars().take(LOG_SNIPPET_CHARS).collect::<String>()
        );

        let decision = format!("{} ({})", intent, language);
        self.journal.record(query, &decision, &reply).await;

        reply
    }
}

/// Unwrap a reply produced on a spawned task.
///
/// A task that panicked or was cancelled is answered with the generic error text.
pub fn reply_or_fallback(joined: std::result::Result<String, JoinError>) -> String {
    match joined {
        Ok(reply) => reply,
        Err(e) => {
            error!("Unhandled failure in generate_reply: {}", e);
            UNEXPECTED_ERROR.to_string()
        }
    }
}

/// `• title (link)` per source, in order.
fn source_lines(sources: &[SearchSource]) -> String {
    sources
        .iter()
        .map(|s| format!("• {} ({})", s.title, s.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalEntry;
    use crate::market::MarketDataSource;
    use crate::models::{Language, OrganicResult};
    use crate::search::{PageFetcher, WebSearch};
    use crate::symbols::AliasMap;
    use crate::templates::render;
    use crate::test_support::{
        market, organic, ScriptedGenerator, StaticMarkets, StaticPages, StaticSearch,
    };
    use std::path::Path;

    const PRICE_EN: &str = r#"{"intent":"price","language":"en"}"#;
    const PRICE_FA: &str = r#"{"intent":"price","language":"fa"}"#;
    const RESEARCH_EN: &str = r#"{"intent":"research","language":"en"}"#;

    struct Harness {
        llm: Arc<ScriptedGenerator>,
        markets: Arc<dyn MarketDataSource>,
        search: Arc<dyn WebSearch>,
        pages: Arc<dyn PageFetcher>,
        aliases: AliasMap,
        journal: ExampleJournal,
    }

    impl Harness {
        fn new(llm: ScriptedGenerator) -> Self {
            Self {
                llm: Arc::new(llm),
                markets: Arc::new(StaticMarkets::new(vec![])),
                search: Arc::new(StaticSearch::new(vec![])),
                pages: Arc::new(StaticPages::new()),
                aliases: AliasMap::default(),
                journal: ExampleJournal::disabled(),
            }
        }

        fn build(self) -> Orchestrator {
            Orchestrator::new(
                IntentClassifier::new(self.llm.clone(), "clf"),
                Arc::new(SymbolResolver::with_snapshot(self.markets.clone(), self.aliases)),
                PriceAggregator::new(self.markets),
                ResearchPipeline::new(self.search, self.pages, Some(self.llm), "synth"),
                self.journal,
            )
        }
    }

    fn results(n: usize) -> Vec<OrganicResult> {
        (1..=n)
            .map(|i| {
                organic(
                    &format!("Result {}", i),
                    &format!("https://r{}.example", i),
                    &format!("snippet {}", i),
                )
            })
            .collect()
    }

    fn read_journal(path: &Path) -> Vec<JournalEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_price_of_bitcoin() {
        let mut h = Harness::new(ScriptedGenerator::new().reply("clf", PRICE_EN));
        h.aliases = AliasMap::from_pairs([("bitcoin", "BTC"), ("btc", "BTC")]);
        h.markets = Arc::new(StaticMarkets::new(vec![
            market("BTC", "BTCUSDT", "USDT", "65000"),
            market("BTC", "BTCTMN", "TMN", "4200000000"),
        ]));

        let reply = h.build().generate_reply("what is the price of bitcoin", "t1").await;
        let lines: Vec<&str> = reply.lines().collect();

        assert!(lines[0].contains("BTC"));
        let tmn = lines.iter().position(|l| l.contains("TMN")).unwrap();
        let usdt = lines.iter().position(|l| l.contains("USDT")).unwrap();
        assert!(tmn < usdt);
    }

    #[tokio::test]
    async fn test_farsi_price_uses_farsi_templates() {
        let mut eth = market("ETH", "ETHTMN", "TMN", "150000000");
        eth.fa_base_asset = Some("اتریوم".to_string());
        let markets = vec![eth];

        let mut h = Harness::new(ScriptedGenerator::new().reply("clf", PRICE_FA));
        h.aliases = AliasMap::from_markets(&markets);
        h.markets = Arc::new(StaticMarkets::new(markets));

        let reply = h.build().generate_reply("قیمت اتریوم", "t2").await;

        let fa = templates(Language::Fa);
        let header = render(fa.price_header, &[("symbol", "ETH")]);
        let header_prefix = header.split("{timestamp}").next().unwrap();
        assert!(reply.starts_with(header_prefix));
        assert!(reply.contains("• TMN (ETHTMN): 150000000"));
        assert!(!reply.contains("Current prices"));
    }

    #[tokio::test]
    async fn test_unresolved_price_query_falls_back_to_research() {
        let dir = tempfile::tempdir().unwrap();
        let journal_path = dir.path().join("examples.jsonl");

        let mut h = Harness::new(
            ScriptedGenerator::new()
                .reply("clf", PRICE_EN)
                .reply("synth", "Nobody lists that coin yet."),
        );
        h.aliases = AliasMap::from_pairs([("bitcoin", "BTC")]);
        h.search = Arc::new(StaticSearch::new(results(2)));
        h.journal = ExampleJournal::new(&journal_path);

        let reply = h.build().generate_reply("how much is floopcoin?", "t3").await;

        assert!(!reply.is_empty());
        assert_eq!(
            reply,
            "Nobody lists that coin yet.\n\nSources:\n\
             • Result 1 (https://r1.example)\n\
             • Result 2 (https://r2.example)"
        );

        let entries = read_journal(&journal_path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, "research (en)");
        assert_eq!(entries[0].response_text_snippet, reply);
    }

    #[tokio::test]
    async fn test_unresolved_price_query_with_empty_map_still_replies() {
        let h = Harness::new(ScriptedGenerator::new().reply("clf", PRICE_EN));
        let reply = h.build().generate_reply("price of btc", "t4").await;
        assert_eq!(reply, templates(Language::En).search_no_results);
    }

    #[tokio::test]
    async fn test_research_sources_keep_rank_order() {
        let mut h = Harness::new(
            ScriptedGenerator::new()
                .reply("clf", RESEARCH_EN)
                .reply("synth", "Solana is a proof-of-stake chain."),
        );
        h.search = Arc::new(StaticSearch::new(results(4)));

        let reply = h.build().generate_reply("what is solana?", "t5").await;
        let (answer, sources) = reply.split_once("\n\nSources:\n").unwrap();

        assert_eq!(answer, "Solana is a proof-of-stake chain.");
        let sources: Vec<&str> = sources.lines().collect();
        assert_eq!(
            sources,
            vec![
                "• Result 1 (https://r1.example)",
                "• Result 2 (https://r2.example)",
                "• Result 3 (https://r3.example)",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_synthesis_returns_error_template() {
        let mut h = Harness::new(
            ScriptedGenerator::new()
                .reply("clf", r#"{"intent":"research","language":"fa"}"#)
                .reply("synth", ""),
        );
        h.search = Arc::new(StaticSearch::new(results(1)));

        let reply = h.build().generate_reply("NFT چیست؟", "t6").await;
        assert_eq!(reply, templates(Language::Fa).synth_api_error);
    }

    #[tokio::test]
    async fn test_llm_down_still_replies() {
        let mut h = Harness::new(ScriptedGenerator::failing());
        h.aliases = AliasMap::from_pairs([("bitcoin", "BTC")]);
        h.search = Arc::new(StaticSearch::new(results(1)));

        // Classification falls back to (research, en); synthesis fails too.
        let reply = h.build().generate_reply("price of bitcoin", "t7").await;
        let en = templates(Language::En);
        assert!(reply.starts_with(en.synth_api_error));
        assert!(reply.contains("• Result 1 (https://r1.example)"));
    }

    #[tokio::test]
    async fn test_search_message_is_returned_verbatim() {
        let mut h = Harness::new(ScriptedGenerator::new().reply("clf", RESEARCH_EN));
        h.search = Arc::new(StaticSearch::unconfigured());

        let reply = h.build().generate_reply("what is defi", "t8").await;
        assert_eq!(
            reply,
            render(
                templates(Language::En).search_api_error,
                &[("e", "API key not configured")]
            )
        );
    }

    async fn exploding_reply() -> String {
        panic!("reply generation exploded")
    }

    #[tokio::test]
    async fn test_panicked_reply_task_gets_generic_error() {
        let joined = tokio::spawn(exploding_reply()).await;
        assert_eq!(reply_or_fallback(joined), UNEXPECTED_ERROR);

        let joined = tokio::spawn(async { "ok".to_string() }).await;
        assert_eq!(reply_or_fallback(joined), "ok");
    }

    #[tokio::test]
    async fn test_search_uses_classified_language_hint() {
        for (classification, query, hint) in [
            (r#"{"intent":"research","language":"fa"}"#, "سولانا چیست؟", "fa"),
            (RESEARCH_EN, "what is solana", "en"),
        ] {
            let search = Arc::new(StaticSearch::new(results(1)));
            let mut h = Harness::new(
                ScriptedGenerator::new()
                    .reply("clf", classification)
                    .reply("synth", "Solana is a blockchain."),
            );
            h.search = search.clone();

            h.build().generate_reply(query, "t9").await;

            let queries = search.queries.lock().unwrap().clone();
            assert_eq!(queries, vec![(query.to_string(), hint.to_string())]);
        }
    }
}
