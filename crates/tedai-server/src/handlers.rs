//! HTTP Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use tedai_core::{AgentError, Message, SessionId};

use crate::state::AppState;

const INVALID_QUERY: &str = "Query is required and must be a string";
const PROCESSING_FAILED: &str = "An error occurred while processing your request";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure modes of the chat endpoint
#[derive(Debug)]
pub enum ApiError {
    InvalidQuery,
    Agent(AgentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::InvalidQuery => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: INVALID_QUERY.into(),
                    details: None,
                },
            ),
            Self::Agent(err @ AgentError::MaxIterations(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: err.user_message(),
                    details: None,
                },
            ),
            Self::Agent(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: PROCESSING_FAILED.into(),
                    details: Some(err.to_string()),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// `sessionId` from a request body, verbatim; the default session only when absent
fn session_id_of(body: Option<&Value>) -> SessionId {
    match body.and_then(|b| b.get("sessionId")) {
        None | Some(Value::Null) => SessionId::default(),
        Some(Value::String(id)) => SessionId::from_string(id.as_str()),
        Some(other) => SessionId::from_string(other.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Server is running",
    })
}

/// Chat endpoint: one user turn in, one assistant answer out
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected chat body");
        ApiError::InvalidQuery
    })?;

    let query = body
        .get("query")
        .and_then(Value::as_str)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::InvalidQuery)?;
    let session_id = session_id_of(Some(&body));
    let max_turns = state.sessions.policy().max_turns;

    tracing::info!(session = %session_id, "Chat request");

    // Held for the whole loop so requests sharing an id run one at a time
    let handle = state.sessions.get_or_create(&session_id);
    let mut session = handle.lock().await;

    session.append(Message::user(query));
    session.truncate(max_turns);

    let result = state.agent.run(&mut session.conversation).await;

    let dropped = session.truncate(max_turns);
    session.touch();
    tracing::debug!(
        session = %session_id,
        turns = session.message_count(),
        dropped,
        "History updated"
    );
    drop(session);
    state.sessions.touch(&session_id);

    match result {
        Ok(response) => Ok(Json(ChatResponse {
            response,
            session_id: session_id.to_string(),
        })),
        Err(err) => {
            tracing::error!(
                session = %session_id,
                error = %err,
                retryable = err.is_retryable(),
                "Chat request failed"
            );
            Err(ApiError::Agent(err))
        }
    }
}

/// Forget a session's history; succeeds whether or not it existed
pub async fn clear_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Json<ClearResponse> {
    let body = payload.ok().map(|Json(body)| body);
    let session_id = session_id_of(body.as_ref());

    let existed = state.sessions.clear(&session_id);
    tracing::info!(session = %session_id, existed, "Session cleared");

    Json(ClearResponse {
        message: "Session cleared successfully",
    })
}
