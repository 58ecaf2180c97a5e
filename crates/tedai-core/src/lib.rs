//! # tedai-core
//!
//! Chat orchestration with a provider-agnostic LLM abstraction, a validated
//! tool registry and bounded in-memory sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────────┐ │
//! │  │ Orchestration│  │    Tools    │  │   LlmProvider       │ │
//! │  │  LoopState   │──│   Registry  │──│   (Strategy)        │ │
//! │  └──────────────┘  └─────────────┘  └─────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!            ▲
//!            │ &mut Conversation (locked per session)
//!   ┌────────┴────────┐
//!   │  SessionStore   │
//!   └─────────────────┘
//! ```

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result, sanitize_api_error};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AttemptPolicy, LoopState};
pub use session::{
    MemorySessionStore, Session, SessionHandle, SessionId, SessionPolicy, SessionStore,
};
pub use tool::{
    ParameterSchema, Tool, ToolArguments, ToolCall, ToolRegistry, ToolResult, ToolSchema,
};
