//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for the OpenAI-compatible chat
//! completions API with function calling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use tedai_core::{
    error::{AgentError, Result, sanitize_api_error},
    message::{Message, Role},
    provider::{
        Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage,
    },
    tool::{ToolCall, ToolSchema},
};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq provider configuration
#[derive(Clone, Debug)]
pub struct GroqConfig {
    /// API key; requests fail with an auth error when unset
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Model used when options leave it empty
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            model: tedai_core::provider::DEFAULT_MODEL.into(),
            timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl GroqConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: non_empty("GROQ_API_KEY"),
            base_url: non_empty("GROQ_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty("LLM_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}

/// Groq (OpenAI-compatible) LLM provider
pub struct GroqProvider {
    client: Client,
    config: GroqConfig,
}

impl GroqProvider {
    /// Create from configuration
    pub fn from_config(config: GroqConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(GroqConfig::from_env())
    }

    pub const fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Auth("GROQ_API_KEY is not set".into()))
    }

    /// Convert conversation turns to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: Some(m.content.clone()),
                tool_calls: (m.role == Role::Assistant && m.has_tool_calls()).then(|| {
                    m.tool_calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: Some(call.id.clone()),
                            kind: Some("function".into()),
                            function: WireFunction {
                                name: call.name.clone(),
                                arguments: serde_json::Value::String(call.arguments.clone()),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Declare tools in the OpenAI function format
    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|schema| WireTool {
                kind: "function",
                function: WireFunctionDef {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.parameters_json(),
                },
            })
            .collect()
    }

    fn build_request<'a>(
        &'a self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &'a GenerationOptions,
    ) -> ChatCompletionRequest<'a> {
        let model = if options.model.is_empty() {
            self.config.model.as_str()
        } else {
            options.model.as_str()
        };

        ChatCompletionRequest {
            model,
            messages: Self::convert_messages(messages),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools: Self::convert_tools(tools),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    /// Convert an API response to a completion
    fn convert_completion(response: ChatCompletionResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = match tc.function.arguments {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                match tc.id.filter(|id| !id.is_empty()) {
                    Some(id) => ToolCall::new(id, tc.function.name, arguments),
                    None => ToolCall::with_generated_id(tc.function.name, arguments),
                }
            })
            .collect();

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: if response.model.is_empty() {
                model.to_string()
            } else {
                response.model
            },
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_api),
        })
    }

    /// Map a non-success status and body to an error
    fn status_error(status: StatusCode, body: &str) -> AgentError {
        let detail = format!("Groq API error ({status}): {}", sanitize_api_error(body));
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(detail),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(detail),
            s if s.is_server_error() => AgentError::ProviderUnavailable(detail),
            _ => AgentError::Provider(detail),
        }
    }

    fn transport_error(err: &reqwest::Error) -> AgentError {
        if err.is_connect() || err.is_timeout() {
            AgentError::ProviderUnavailable(err.to_string())
        } else {
            AgentError::Provider(err.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(api_key) = self.api_key() else {
            return Ok(false);
        };

        match self
            .client
            .get(self.url("models"))
            .bearer_auth(api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Groq health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let api_key = self.api_key()?;
        let request = self.build_request(messages, tools, options);

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".into());
            return Err(Self::status_error(status, &body));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Invalid completion body: {e}")))?;

        let completion = Self::convert_completion(body, request.model)?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt = usage.prompt_tokens,
                completion = usage.completion_tokens,
                tool_calls = completion.tool_calls.len(),
                "Groq completion"
            );
        }
        Ok(completion)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let list: ModelList = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
                context_length: m.context_window,
            })
            .collect())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// Usually a JSON-encoded string; some servers send an object
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
    #[serde(default)]
    context_window: Option<u32>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tedai_core::tool::ParameterSchema;

    use super::*;

    fn search_schema() -> ToolSchema {
        ToolSchema {
            name: "search_web".into(),
            description: "Search the web".into(),
            parameters: vec![ParameterSchema::required("query", "string", "Query")],
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = GroqConfig::default();
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GROQ_API_KEY", "gsk_test"),
            ("GROQ_BASE_URL", "http://localhost:11434/v1/"),
            ("LLM_MODEL", "  "),
        ]);
        let config = GroqConfig::from_lookup(|k| env.get(k).map(ToString::to_string));

        assert_eq!(config.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.base_url, "http://localhost:11434/v1/");
        assert_eq!(config.model, "llama-3.1-8b-instant");

        let provider = GroqProvider::from_config(config);
        assert_eq!(
            provider.url("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("latest AI news"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "search_web", r#"{"query":"AI news"}"#)],
            ),
            Message::tool("call_1", "Headline\nBody\nURL: https://example.com"),
        ];

        let converted = GroqProvider::convert_messages(&messages);
        let json = serde_json::to_value(&converted).unwrap();

        assert_eq!(json[0]["role"], "system");
        assert!(json[1].get("tool_calls").is_none());
        assert_eq!(json[2]["content"], "");
        assert_eq!(json[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(json[2]["tool_calls"][0]["type"], "function");
        assert_eq!(
            json[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"AI news"}"#
        );
        assert_eq!(json[3]["role"], "tool");
        assert_eq!(json[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_request_declares_tools_with_auto_choice() {
        let provider = GroqProvider::from_config(GroqConfig::default());
        let options = GenerationOptions::default();
        let request =
            provider.build_request(&[Message::user("hi")], &[search_schema()], &options);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "search_web");
        assert_eq!(
            json["tools"][0]["function"]["parameters"]["required"][0],
            "query"
        );

        let bare = provider.build_request(&[Message::user("hi")], &[], &options);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_text_completion() {
        let body = r#"{
            "model": "llama-3.1-8b-instant",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 50, "completion_tokens": 1, "total_tokens": 51}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let completion = GroqProvider::convert_completion(response, "fallback").unwrap();

        assert_eq!(completion.content, "4");
        assert!(!completion.has_tool_calls());
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage.unwrap().total_tokens, 51);
    }

    #[test]
    fn test_parse_tool_call_completion() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_abc", "type": "function", "function": {"name": "search_web", "arguments": "{\"query\":\"AI news\"}"}},
                        {"type": "function", "function": {"name": "search_web", "arguments": {"query": "more"}}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let completion = GroqProvider::convert_completion(response, "llama").unwrap();

        assert_eq!(completion.content, "");
        assert_eq!(completion.model, "llama");
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[0].id, "call_abc");
        assert_eq!(completion.tool_calls[0].arguments, r#"{"query":"AI news"}"#);
        assert!(completion.tool_calls[1].id.starts_with("call_"));
        assert_eq!(
            completion.tool_calls[1].parse_arguments().unwrap()["query"],
            "more"
        );
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            GroqProvider::convert_completion(response, "m"),
            Err(AgentError::Provider(_))
        ));
    }

    #[test]
    fn test_status_error_mapping() {
        let auth = GroqProvider::status_error(StatusCode::UNAUTHORIZED, "bad key gsk_123");
        assert!(matches!(auth, AgentError::Auth(ref m) if m.contains("[REDACTED]")));
        assert!(matches!(
            GroqProvider::status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            GroqProvider::status_error(StatusCode::BAD_GATEWAY, ""),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            GroqProvider::status_error(StatusCode::BAD_REQUEST, "tool_use_failed"),
            AgentError::Provider(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = GroqProvider::from_config(GroqConfig::default());
        let err = provider
            .complete(&[Message::user("hi")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Auth(_)));
        assert!(!provider.health_check().await.unwrap());
    }
}
