//! Conversation Messages
//!
//! Chat turns as stored in a session and sent to the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt, injected at call time only
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single turn in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (empty for assistant turns that only carry tool calls)
    pub content: String,

    /// Call this tool turn answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls requested by an assistant turn, in model order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Create a tool result message answering `tool_call_id`
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Ordered conversation history
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Keep only the most recent `max` messages.
    ///
    /// Tool turns left at the front without their assistant turn are dropped
    /// too, so every remaining tool turn still follows the call it answers.
    /// Returns the number of messages removed.
    pub fn truncate_to_last(&mut self, max: usize) -> usize {
        let before = self.messages.len();
        if before > max {
            self.messages.drain(..before - max);
        }

        let orphaned = self
            .messages
            .iter()
            .take_while(|m| m.role == Role::Tool)
            .count();
        self.messages.drain(..orphaned);

        before - self.messages.len()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(!msg.has_tool_calls());

        let tool = Message::tool("call_1", "result");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_truncate_keeps_most_recent() {
        let mut conv = Conversation::new();
        for i in 0..12 {
            conv.push(Message::user(format!("q{i}")));
        }

        assert_eq!(conv.truncate_to_last(10), 2);
        assert_eq!(conv.len(), 10);
        assert_eq!(conv.messages()[0].content, "q2");
        assert_eq!(conv.last().unwrap().content, "q11");
    }

    #[test]
    fn test_truncate_drops_orphaned_tool_turns() {
        let mut conv = Conversation::new();
        conv.push(Message::user("latest news?"));
        conv.push(Message::assistant_with_tool_calls(
            "",
            vec![
                ToolCall::new("a", "search_web", "{}"),
                ToolCall::new("b", "search_web", "{}"),
            ],
        ));
        conv.push(Message::tool("a", "hit a"));
        conv.push(Message::tool("b", "hit b"));
        conv.push(Message::assistant("Here is the news."));

        // Cutting at 3 would leave a tool turn for "b" first
        conv.truncate_to_last(3);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.messages()[0].role, Role::Assistant);
    }

    #[test]
    fn test_truncate_noop_when_short() {
        let mut conv = Conversation::new();
        conv.push(Message::user("Hi"));
        conv.push(Message::assistant("Hello!"));

        assert_eq!(conv.truncate_to_last(10), 0);
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Message::user("Hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }
}
