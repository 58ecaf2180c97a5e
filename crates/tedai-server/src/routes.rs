//! Router Assembly

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::handlers::{chat_handler, clear_handler, health_check};
use crate::state::AppState;

/// JSON API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/clear", post(clear_handler))
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let origins = config
        .allowed_origins()
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Full application: API, static UI fallback, CORS and request tracing
pub fn app(state: AppState, config: &ServerConfig) -> Result<Router> {
    Ok(api_routes()
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
