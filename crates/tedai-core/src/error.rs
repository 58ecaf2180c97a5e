//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Attempt budget of the orchestration loop exhausted
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Parse error (e.g., tool call arguments)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Check if error is retryable
    ///
    /// The orchestration loop never retries; the server logs this flag.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::MaxIterations(_) => {
                "Failed to get response from AI after multiple attempts".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

const MAX_API_ERROR_CHARS: usize = 200;

/// Scrub secret-looking tokens from upstream error text and cap its length.
///
/// Redacts `Bearer` credentials and keys with the `gsk_`, `sk-` and `tvly-`
/// prefixes used by the chat and search providers.
pub fn sanitize_api_error(input: &str) -> String {
    const PREFIXES: [&str; 4] = ["Bearer ", "gsk_", "sk-", "tvly-"];

    let mut scrubbed = input.to_string();
    for prefix in PREFIXES {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(prefix) {
            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = scrubbed[content_start..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
                .map_or(scrubbed.len(), |i| content_start + i);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let cut: String = scrubbed.chars().take(MAX_API_ERROR_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(AgentError::RateLimited("slow down".into()).is_retryable());
        assert!(!AgentError::ToolNotFound("nope".into()).is_retryable());
        assert!(!AgentError::MaxIterations(5).is_retryable());
    }

    #[test]
    fn test_exhaustion_message() {
        let err = AgentError::MaxIterations(5);
        assert_eq!(err.to_string(), "Maximum iterations (5) reached");
        assert_eq!(
            err.user_message(),
            "Failed to get response from AI after multiple attempts"
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_api_error("Invalid API Key gsk_abc123XYZ provided");
        assert_eq!(msg, "Invalid API Key [REDACTED] provided");

        let bearer = sanitize_api_error("header was Bearer tvly-secret.value");
        assert!(!bearer.contains("secret"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(500);
        let msg = sanitize_api_error(&long);
        assert_eq!(msg.chars().count(), 203);
        assert!(msg.ends_with("..."));
    }
}
