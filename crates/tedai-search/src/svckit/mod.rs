//! Service Kit - Agent Tools
//!
//! Tools that implement `tedai_core::Tool` on top of a search client.

mod web_search;

pub use web_search::{WebSearchTool, format_hits};
