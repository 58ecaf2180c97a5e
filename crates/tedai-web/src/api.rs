//! API Client

use serde::{Deserialize, Serialize};

/// Used when the page has no usable origin (e.g. opened from disk)
const FALLBACK_ORIGIN: &str = "http://localhost:5001";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    Error,
}

impl Sender {
    pub const fn class(self) -> &'static str {
        match self {
            Self::User => "message-user",
            Self::Assistant => "message-bot",
            Self::Error => "message-error",
        }
    }
}

/// Chat message for display
#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub id: usize,
    pub sender: Sender,
    pub content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
}

impl ErrorBody {
    fn describe(self, status: u16) -> String {
        match (self.error, self.details) {
            (Some(error), Some(details)) => format!("{error} ({details})"),
            (Some(error), None) => error,
            _ => format!("Server error: {status}"),
        }
    }
}

/// Absolute URL for an API path; reqwest on wasm rejects relative URLs
fn api_url(path: &str) -> String {
    let base = option_env!("TEDAI_API_URL").map_or_else(
        || {
            web_sys::window()
                .and_then(|w| w.location().origin().ok())
                .filter(|origin| origin.starts_with("http"))
                .unwrap_or_else(|| FALLBACK_ORIGIN.into())
        },
        ToString::to_string,
    );
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Send a chat message to the backend
pub async fn send_chat(query: &str, session_id: Option<&str>) -> Result<ChatReply, String> {
    let response = reqwest::Client::new()
        .post(api_url("/api/chat"))
        .json(&ChatRequest { query, session_id })
        .send()
        .await
        .map_err(|e| format!("Could not reach the server: {e}"))?;

    let status = response.status();
    if status.is_success() {
        response.json::<ChatReply>().await.map_err(|e| e.to_string())
    } else {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(body.describe(status.as_u16()))
    }
}

/// Forget the server-side history of a session
pub async fn clear_session(session_id: Option<&str>) -> Result<(), String> {
    let body = serde_json::json!({ "sessionId": session_id });

    let response = reqwest::Client::new()
        .post(api_url("/api/chat/clear"))
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Could not reach the server: {e}"))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("Failed to clear chat: {}", response.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(ChatRequest {
            query: "hi",
            session_id: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"query": "hi"}));

        let json = serde_json::to_value(ChatRequest {
            query: "hi",
            session_id: Some("abc"),
        })
        .unwrap();
        assert_eq!(json["sessionId"], "abc");
    }

    #[test]
    fn test_error_description() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error": "An error occurred while processing your request", "details": "Tool not found: x"}"#,
        )
        .unwrap();
        assert_eq!(
            body.describe(500),
            "An error occurred while processing your request (Tool not found: x)"
        );
        assert_eq!(ErrorBody::default().describe(502), "Server error: 502");
    }
}
