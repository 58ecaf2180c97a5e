//! Mock Search Client
//!
//! For testing and offline demos. Returns canned hits without touching the
//! network and records every query it receives.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::SearchClient;
use crate::error::{Result, SearchError};
use crate::model::SearchHit;

/// Mock search client with static results
pub struct MockSearchClient {
    hits: Option<Vec<SearchHit>>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl Default for MockSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchClient {
    /// Two generated hits per query
    pub fn new() -> Self {
        Self {
            hits: None,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Always return `hits`
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits: Some(hits),
            ..Self::new()
        }
    }

    /// Fail every search with an API error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    /// Queries received so far, oldest first
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    fn generated_hits(query: &str) -> Vec<SearchHit> {
        let slug: String = query
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();

        vec![
            SearchHit::new(
                format!("{query} - overview"),
                format!("A summary of recent coverage about {query}."),
                format!("https://news.example.com/{slug}"),
            ),
            SearchHit::new(
                format!("{query} - analysis"),
                format!("Background and analysis on {query}."),
                format!("https://blog.example.org/{slug}"),
            ),
        ]
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.queries.lock().await.push(query.to_string());

        if let Some(message) = &self.failure {
            return Err(SearchError::Api {
                status: 503,
                message: message.clone(),
            });
        }

        Ok(self
            .hits
            .clone()
            .unwrap_or_else(|| Self::generated_hits(query)))
    }

    fn name(&self) -> &str {
        "MockSearch"
    }
}
