//! Error types for the crypto query bot

use thiserror::Error;

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {

    // =============================
    // Capability Errors
    // =============================

    /// A capability is missing credentials or an endpoint.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network, timeout or non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response arrived but did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("LLM error: {0}")]
    Llm(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Classify a reqwest failure: body decoding problems are shape errors,
    /// everything else is a transport error.
    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            BotError::Parse(format!("{}: {}", context, err))
        } else {
            BotError::Transport(format!("{}: {}", context, err))
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, BotError::Transport(_) | BotError::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = BotError::Config("SERPAPI_KEY missing".to_string());
        assert_eq!(err.to_string(), "Configuration error: SERPAPI_KEY missing");

        let err = BotError::Parse("markets is not a list".to_string());
        assert!(err.to_string().starts_with("Parse error"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BotError = json_err.into();
        assert!(matches!(err, BotError::Serialization(_)));
    }
}
