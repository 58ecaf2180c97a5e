//! Web Search Tool
//!
//! Lets the model look up current events through the configured search
//! client. One tool call is one provider search.

use std::sync::Arc;

use async_trait::async_trait;

use tedai_core::{
    AgentError, ParameterSchema, Result as CoreResult, Tool, ToolArguments, ToolResult,
    ToolSchema,
};

use crate::client::SearchClient;
use crate::model::SearchHit;

pub const TOOL_NAME: &str = "search_web";

/// Tool for searching the web
pub struct WebSearchTool {
    client: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }
}

/// Hits as model context: one block per hit, blank line between blocks
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(SearchHit::to_context)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: TOOL_NAME.into(),
            description: "Useful for when you need to answer questions about current events or the world. Use this to get real-time information from the web.".into(),
            parameters: vec![ParameterSchema::required(
                "query",
                "string",
                "The search query to find relevant information.",
            )],
        }
    }

    async fn execute(&self, arguments: &ToolArguments) -> CoreResult<ToolResult> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AgentError::ToolValidation("query must be a string".into()))?;

        tracing::info!(provider = self.client.name(), query, "Searching the web");
        let hits = self.client.search(query).await?;
        tracing::debug!(hits = hits.len(), "Search finished");

        let output = if hits.is_empty() {
            format!("No results found for \"{query}\".")
        } else {
            format_hits(&hits)
        };

        Ok(ToolResult::success(TOOL_NAME, output))
    }
}
