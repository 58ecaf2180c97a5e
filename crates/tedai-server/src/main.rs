//! TedAI HTTP Server
//!
//! Axum server exposing the chat API and serving the built WASM UI.
//! Answers come from an LLM that may call the `search_web` tool.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tedai_core::{AgentBuilder, LlmProvider, MemorySessionStore, SessionStore, ToolRegistry};
use tedai_runtime::GroqProvider;
use tedai_search::{SearchClient, TavilyClient, TavilyConfig, tools::WebSearchTool};

use crate::config::ServerConfig;
use crate::state::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before reading RUST_LOG
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // LLM provider
    let provider = Arc::new(GroqProvider::from_env());
    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to {}", provider.name());
            if let Ok(models) = provider.list_models().await {
                tracing::info!("  {} models available", models.len());
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - chat requests will fail", provider.name());
            tracing::warn!("  Check GROQ_API_KEY and GROQ_BASE_URL in .env");
        }
    }
    let model = provider.config().model.clone();
    tracing::info!("  Model: {}", model);

    // Web search
    let tavily = TavilyConfig::from_env()?;
    if tavily.api_key.is_none() {
        tracing::warn!("⚠ TAVILY_API_KEY not set - web search will fail");
    }
    let search: Arc<dyn SearchClient> = Arc::new(TavilyClient::from_config(tavily));

    // Tools
    let tools = ToolRegistry::builder()
        .register(WebSearchTool::new(search))
        .build()?;

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let agent = AgentBuilder::new()
        .provider(provider)
        .tools(Arc::new(tools))
        .model(model)
        .build()?;

    // Sessions
    let sessions = Arc::new(MemorySessionStore::with_policy(config.sessions.clone()));
    spawn_session_purge(sessions.clone());

    let state = AppState::new(agent, sessions);
    let app = routes::app(state, &config)?;

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 TedAI server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /api/health     - Health check");
    tracing::info!("  POST /api/chat       - Send message");
    tracing::info!("  POST /api/chat/clear - Clear session history");
    tracing::info!("  GET  /*              - UI from {}", config.static_dir);
    tracing::info!("Allowed origins: {}", config.allowed_origins().join(", "));
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop idle sessions
fn spawn_session_purge(sessions: Arc<MemorySessionStore>) {
    if sessions.policy().idle_ttl.is_none() {
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::info!(purged, remaining = sessions.len(), "Purged idle sessions");
            }
        }
    });
}
