//! # tedai-runtime
//!
//! Runtime providers for the tedai chat service.
//!
//! ## Providers
//!
//! - **Groq** (default): hosted inference over the OpenAI-compatible
//!   chat completions API. Any other OpenAI-compatible endpoint (OpenAI,
//!   a local Ollama `/v1`) works by pointing `GROQ_BASE_URL` at it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tedai_runtime::GroqProvider;
//!
//! let provider = GroqProvider::from_env();
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "groq")]
pub use groq::{GroqConfig, GroqProvider};

// Re-export core types for convenience
pub use tedai_core::{
    Agent, AgentError, LlmProvider, Message, Result, Role, Session, Tool, ToolRegistry,
};
