//! Search Provider Integration
//!
//! Abstractions and implementations for web search providers.

mod mock;
mod tavily;

pub use mock::MockSearchClient;
pub use tavily::{TavilyClient, TavilyConfig};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::SearchHit;

/// Search client trait (Strategy pattern)
///
/// One call per query against the provider; hits come back in the
/// provider's order.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a free-text search
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Provider name
    fn name(&self) -> &str;
}
