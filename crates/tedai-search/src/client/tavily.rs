//! Tavily Search Client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use tedai_core::sanitize_api_error;

use super::SearchClient;
use crate::error::{Result, SearchError};
use crate::model::{SearchDepth, SearchHit};

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: u32 = 5;
const MAX_RESULTS_LIMIT: u32 = 20;

/// Tavily client configuration
#[derive(Clone, Debug)]
pub struct TavilyConfig {
    /// API key; searches fail with an auth error when unset
    pub api_key: Option<String>,

    pub base_url: String,

    /// Hits requested per search (1-20)
    pub max_results: u32,

    pub search_depth: SearchDepth,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TavilyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            max_results: DEFAULT_MAX_RESULTS,
            search_depth: SearchDepth::Basic,
            timeout_secs: 120,
        }
    }
}

impl TavilyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let max_results = match non_empty("TAVILY_MAX_RESULTS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_RESULTS_LIMIT).contains(n))
                .ok_or_else(|| {
                    SearchError::Config(format!(
                        "TAVILY_MAX_RESULTS must be between 1 and {MAX_RESULTS_LIMIT}, got '{raw}'"
                    ))
                })?,
            None => defaults.max_results,
        };

        let search_depth = match non_empty("TAVILY_SEARCH_DEPTH") {
            Some(raw) => raw.parse::<SearchDepth>().map_err(SearchError::Config)?,
            None => defaults.search_depth,
        };

        Ok(Self {
            api_key: non_empty("TAVILY_API_KEY"),
            base_url: non_empty("TAVILY_BASE_URL").unwrap_or(defaults.base_url),
            max_results,
            search_depth,
            ..defaults
        })
    }
}

/// Tavily web search client
pub struct TavilyClient {
    client: Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn from_config(config: TavilyConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    pub const fn config(&self) -> &TavilyConfig {
        &self.config
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&self, query: &'a str) -> TavilySearchRequest<'a> {
        TavilySearchRequest {
            query,
            search_depth: self.config.search_depth,
            max_results: self.config.max_results,
            topic: "general",
            include_answer: false,
        }
    }

    fn status_error(status: StatusCode, body: &str) -> SearchError {
        let message = sanitize_api_error(body);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SearchError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => SearchError::RateLimited(message),
            _ => SearchError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query is empty".into()));
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::Auth("TAVILY_API_KEY is not set".into()))?;

        tracing::debug!(query, "Tavily search");
        let response = self
            .client
            .post(self.search_url())
            .bearer_auth(api_key)
            .json(&self.build_request(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let body: TavilySearchResponse = response.json().await?;
        Ok(body.into_hits())
    }

    fn name(&self) -> &str {
        "Tavily"
    }
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    max_results: u32,
    topic: &'static str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

impl TavilySearchResponse {
    fn into_hits(self) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                content: r.content,
                score: r.score,
            })
            .collect()
    }
}
