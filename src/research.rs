//! Research pipeline
//!
//! Search → scrape-or-snippet → synthesize. The search stage turns the top
//! results into labeled context fragments; synthesis asks the LLM to answer
//! using only those fragments.

use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::{Language, OrganicResult, ResearchOutcome, SearchSource};
use crate::search::{extract_paragraph_text, truncate_chars, PageFetcher, WebSearch};
use crate::templates::{render, templates};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How many search results are turned into context.
pub const MAX_SOURCES: usize = 3;
/// Scraped text longer than this is cut and marked with "...".
pub const MAX_CONTEXT_CHARS: usize = 2000;

const DEFAULT_TITLE: &str = "No title";
const DEFAULT_SNIPPET: &str = "No snippet available.";

pub struct ResearchPipeline {
    search: Arc<dyn WebSearch>,
    pages: Arc<dyn PageFetcher>,
    synthesizer: Option<Arc<dyn TextGenerator>>,
    synthesis_model: String,
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn WebSearch>,
        pages: Arc<dyn PageFetcher>,
        synthesizer: Option<Arc<dyn TextGenerator>>,
        synthesis_model: impl Into<String>,
    ) -> Self {
        Self {
            search,
            pages,
            synthesizer,
            synthesis_model: synthesis_model.into(),
        }
    }

    /// Search the web and gather context for `query`.
    pub async fn research(&self, query: &str, language: Language) -> ResearchOutcome {
        let t = templates(language);
        info!("Performing web search for: '{}' (lang={})", query, language);

        if !self.search.is_configured() {
            error!("SERPAPI_KEY is not set. Web search is disabled.");
            return ResearchOutcome::Message(render(
                t.search_api_error,
                &[("e", "API key not configured")],
            ));
        }

        let results = match self.search.search(query, language.as_str()).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error during web search call: {}", e);
                return ResearchOutcome::Message(render(
                    t.search_api_error,
                    &[("e", e.to_string().as_str())],
                ));
            }
        };

        if results.is_empty() {
            warn!("Web search returned no organic results.");
            return ResearchOutcome::Message(t.search_no_results.to_string());
        }

        let mut fragments = Vec::new();
        let mut sources = Vec::new();

        for (rank, result) in results.iter().take(MAX_SOURCES).enumerate() {
            let Some(link) = result.link.as_deref().filter(|l| !l.is_empty()) else {
                continue;
            };
            let title = result.title.as_deref().unwrap_or(DEFAULT_TITLE);

            sources.push(SearchSource {
                title: title.to_string(),
                link: link.to_string(),
            });

            let text = self.context_text(link, result).await;
            fragments.push(format!("Source {} ({}): {}", rank + 1, title, text));
        }

        if fragments.is_empty() {
            return ResearchOutcome::Message(t.search_no_results.to_string());
        }

        info!("Gathered {} scraped snippets for synthesis.", sources.len());
        ResearchOutcome::Context {
            context: fragments.join("\n\n"),
            sources,
        }
    }

    /// Page text when it beats the snippet, otherwise the snippet.
    async fn context_text(&self, link: &str, result: &OrganicResult) -> String {
        let snippet = result.snippet.as_deref().unwrap_or(DEFAULT_SNIPPET);

        match self.pages.fetch(link).await {
            Ok(html) => {
                let page_text = truncate_chars(&extract_paragraph_text(&html), MAX_CONTEXT_CHARS);
                if prefer_page_text(&page_text, snippet) {
                    page_text
                } else {
                    warn!("Scraping {} yielded little text. Falling back to snippet.", link);
                    snippet.to_string()
                }
            }
            Err(e) => {
                warn!("Failed to scrape {}: {}. Falling back to snippet.", link, e);
                snippet.to_string()
            }
        }
    }

    /// Answer `query` from `context` only, in `language`.
    ///
    /// Returns the localized service message when the LLM is missing or
    /// fails, and `None` when it answered with nothing.
    pub async fn synthesize(&self, query: &str, context: &str, language: Language) -> Option<String> {
        let t = templates(language);

        let Some(synthesizer) = self.synthesizer.as_ref() else {
            error!("LLM client not initialized. Cannot synthesize answer.");
            return Some(t.synth_service_unavailable.to_string());
        };

        info!("Synthesizing answer with LLM in language: {}", language);

        let request = GenerationRequest::new(
            &self.synthesis_model,
            build_synthesis_prompt(t.synth_prompt, context, query),
        );

        match synthesizer.generate(request).await {
            Ok(answer) if answer.trim().is_empty() => {
                warn!("LLM synthesis returned an empty answer.");
                None
            }
            Ok(answer) => {
                info!("LLM synthesis successful.");
                Some(answer)
            }
            Err(e) => {
                error!("Error calling LLM for synthesis: {}", e);
                Some(t.synth_api_error.to_string())
            }
        }
    }
}

/// Scraped text is only used when it is longer than the search snippet.
pub fn prefer_page_text(page_text: &str, snippet: &str) -> bool {
    !page_text.is_empty() && page_text.chars().count() > snippet.chars().count()
}

fn build_synthesis_prompt(preamble: &str, context: &str, query: &str) -> String {
    format!(
        "{}\n\nSearch Results:\n{}\n\nUser's Question:\n{}\n\nAnswer:",
        preamble, context, query
    )
}
