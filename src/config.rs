//! Runtime settings
//!
//! Read once from the environment (after `.env` is loaded by the binary).

use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_OLLAMA_HOST: &str = "http://127.0.0.1:11434";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gemma2:2b";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "gemma2:9b";
pub const DEFAULT_WALLEX_API_URL: &str = "https://api.wallex.ir/hector/web/v1/markets";

#[derive(Debug, Clone)]
pub struct Settings {
    pub ollama_host: String,
    pub classifier_model: String,
    pub synthesis_model: String,
    pub llm_timeout: Duration,
    pub wallex_api_url: String,
    pub serpapi_key: Option<String>,
    pub log_file: String,
    pub example_log_file: String,
    /// Zero means the alias table is only built at start-up.
    pub symbol_refresh_interval: Duration,
    pub api_port: u16,
    /// Problems found while reading the environment. Held until a
    /// subscriber exists; see [`Settings::log_warnings`].
    pub warnings: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            llm_timeout: Duration::from_secs(120),
            wallex_api_url: DEFAULT_WALLEX_API_URL.to_string(),
            serpapi_key: None,
            log_file: "bot.log".to_string(),
            example_log_file: "examples.jsonl".to_string(),
            symbol_refresh_interval: Duration::ZERO,
            api_port: 8080,
            warnings: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut warnings = Vec::new();

        let serpapi_key = get("SERPAPI_KEY");
        if serpapi_key.is_none() {
            warnings.push("SERPAPI_KEY not found. Web search will fail.".to_string());
        }

        let llm_timeout_secs = parse_or(
            get("LLM_TIMEOUT_SECS"),
            "LLM_TIMEOUT_SECS",
            120u64,
            &mut warnings,
        );
        let refresh_secs = parse_or(
            get("SYMBOL_REFRESH_SECS"),
            "SYMBOL_REFRESH_SECS",
            0u64,
            &mut warnings,
        );
        let api_port = parse_or(
            get("PORT").or_else(|| get("API_PORT")),
            "PORT",
            defaults.api_port,
            &mut warnings,
        );

        Self {
            ollama_host: get("OLLAMA_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ollama_host),
            classifier_model: get("CLASSIFIER_MODEL").unwrap_or(defaults.classifier_model),
            synthesis_model: get("SYNTHESIS_MODEL").unwrap_or(defaults.synthesis_model),
            llm_timeout: Duration::from_secs(llm_timeout_secs),
            wallex_api_url: get("WALLEX_API_URL").unwrap_or(defaults.wallex_api_url),
            serpapi_key,
            log_file: get("LOG_FILE").unwrap_or(defaults.log_file),
            example_log_file: get("EXAMPLE_LOG_FILE").unwrap_or(defaults.example_log_file),
            symbol_refresh_interval: Duration::from_secs(refresh_secs),
            api_port,
            warnings,
        }
    }

    /// Emit the warnings collected by [`Settings::from_lookup`].
    ///
    /// Call after `init_tracing`; events sent before a subscriber is
    /// installed are dropped.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T, warnings: &mut Vec<String>) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid value for {}: '{}'. Using default.", key, value));
            default
        }),
    }
}
