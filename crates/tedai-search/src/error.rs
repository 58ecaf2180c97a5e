//! Error Types for Web Search

use thiserror::Error;

use tedai_core::AgentError;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Search authentication failed: {0}")]
    Auth(String),

    #[error("Search rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SearchError> for AgentError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Auth(msg) => Self::Auth(msg),
            SearchError::RateLimited(msg) => Self::RateLimited(msg),
            SearchError::InvalidQuery(msg) => Self::ToolValidation(msg),
            SearchError::Config(msg) => Self::Config(msg),
            other => Self::ToolExecution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_agent_error() {
        let err: AgentError = SearchError::Auth("no key".into()).into();
        assert!(matches!(err, AgentError::Auth(_)));

        let err: AgentError = SearchError::Api {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(
            matches!(err, AgentError::ToolExecution(ref m) if m == "Search API error (502): bad gateway")
        );
    }
}
