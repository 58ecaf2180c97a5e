//! # tedai-search
//!
//! Web search for the chat agent: a `search_web` tool backed by a
//! pluggable [`client::SearchClient`] (Tavily in production, a canned mock
//! in tests and offline demos).
//!
//! Results are passed through in provider order; nothing is cached,
//! re-ranked or deduplicated.

pub mod client;
pub mod error;
pub mod model;
pub mod svckit;

pub use client::{MockSearchClient, SearchClient, TavilyClient, TavilyConfig};
pub use error::{Result, SearchError};
pub use model::{SearchDepth, SearchHit};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::WebSearchTool;
}
