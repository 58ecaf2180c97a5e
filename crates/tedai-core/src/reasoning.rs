//! Orchestration Loop
//!
//! Alternates between asking the model and running the tools it requests
//! until the model answers in plain text or the attempt budget runs out.
//!
//! ```text
//!            ┌──────────────── tools done, budget left ───────────────┐
//!            ▼                                                        │
//!   AwaitingModel ──tool calls──▶ ExecutingTools ─────────────────────┤
//!     │       │                                                       │
//!     │       └──text──▶ Done                     budget spent ──▶ Exhausted
//!     └──empty reply, budget left──▶ AwaitingModel
//! ```
//!
//! Transitions are pure functions on [`LoopState`] and [`AttemptPolicy`];
//! [`Agent::run`] drives them and performs the I/O.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry};

/// Maximum number of model round-trips per request
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Bounds the number of model round-trips
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptPolicy {
    pub max_attempts: usize,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AttemptPolicy {
    pub const fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// State after attempt `attempt` produced no final answer
    pub const fn next_attempt(self, attempt: usize) -> LoopState {
        if attempt < self.max_attempts {
            LoopState::AwaitingModel {
                attempt: attempt + 1,
            }
        } else {
            LoopState::Exhausted
        }
    }
}

/// Orchestration state; `attempt` is 1-based
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// About to send attempt `attempt` to the model
    AwaitingModel { attempt: usize },

    /// Model asked for tools during attempt `attempt`
    ExecutingTools {
        attempt: usize,
        calls: Vec<ToolCall>,
    },

    /// Final answer produced
    Done(String),

    /// Attempt budget spent without an answer
    Exhausted,
}

impl LoopState {
    /// Initial state for `policy`
    pub const fn start(policy: AttemptPolicy) -> Self {
        policy.next_attempt(0)
    }

    /// State after the model replied to attempt `attempt`.
    ///
    /// A reply with no tool calls and blank text (empty or whitespace only)
    /// is not an answer: it moves to the next attempt and is never stored
    /// in the conversation.
    pub fn after_completion(attempt: usize, completion: &Completion, policy: AttemptPolicy) -> Self {
        if completion.has_tool_calls() {
            Self::ExecutingTools {
                attempt,
                calls: completion.tool_calls.clone(),
            }
        } else if completion.content.trim().is_empty() {
            policy.next_attempt(attempt)
        } else {
            Self::Done(completion.content.clone())
        }
    }

    /// State after every tool requested during attempt `attempt` ran
    pub const fn after_tools(attempt: usize, policy: AttemptPolicy) -> Self {
        policy.next_attempt(attempt)
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Exhausted)
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System prompt, prepended to every provider call
    pub system_prompt: String,

    /// Attempt budget
    pub attempts: AttemptPolicy,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            attempts: AttemptPolicy::default(),
            generation: GenerationOptions::default(),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You can use tools to get more information when needed. When users ask about current events, news, or information that requires up-to-date data, use the search_web tool. Provide clear, accurate, and helpful responses to user queries.";

/// Drives the orchestration loop
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// `[system] + history`, built per call so the prompt never lands in history
    fn build_messages(&self, conversation: &Conversation) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.config.system_prompt.as_str()));
        messages.extend_from_slice(conversation.messages());
        messages
    }

    /// Run the loop over `conversation`, which already ends with the user turn.
    ///
    /// Turns appended before a failure stay in the conversation.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        let policy = self.config.attempts;
        let mut state = LoopState::start(policy);

        loop {
            state = match state {
                LoopState::AwaitingModel { attempt } => {
                    tracing::debug!(attempt, "Requesting completion");
                    let messages = self.build_messages(conversation);
                    let completion = self
                        .provider
                        .complete(&messages, self.tools.schemas(), &self.config.generation)
                        .await?;

                    let next = LoopState::after_completion(attempt, &completion, policy);
                    match &next {
                        LoopState::ExecutingTools { calls, .. } => {
                            conversation.push(Message::assistant_with_tool_calls(
                                completion.content,
                                calls.clone(),
                            ));
                        }
                        LoopState::Done(answer) => {
                            conversation.push(Message::assistant(answer.as_str()));
                        }
                        _ => tracing::warn!(attempt, "Model returned an empty reply"),
                    }
                    next
                }
                LoopState::ExecutingTools { attempt, calls } => {
                    for call in &calls {
                        tracing::debug!(tool = %call.name, id = %call.id, "Executing tool");
                        let result = self.tools.execute(call).await?;
                        conversation.push(Message::tool(call.id.as_str(), result.output));
                    }
                    LoopState::after_tools(attempt, policy)
                }
                LoopState::Done(answer) => return Ok(answer),
                LoopState::Exhausted => {
                    return Err(AgentError::MaxIterations(policy.max_attempts));
                }
            };
        }
    }

    /// Run with a simple string input (creates temporary conversation)
    pub async fn ask(&self, question: &str) -> Result<String> {
        let mut conversation = Conversation::new();
        conversation.push(Message::user(question));
        self.run(&mut conversation).await
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: None,
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.generation.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.attempts = AttemptPolicy::new(max);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self
            .tools
            .unwrap_or_else(|| Arc::new(ToolRegistry::empty()));

        Ok(Agent::new(provider, tools, self.config))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::message::Role;
    use crate::provider::ModelInfo;
    use crate::tool::{ParameterSchema, Tool, ToolArguments, ToolResult, ToolSchema};

    /// Replays canned completions and records what it was sent
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Completion>>,
        fallback: Option<Completion>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Completion>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fallback: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn repeating(reply: Completion) -> Self {
            let mut provider = Self::new(Vec::new());
            provider.fallback = Some(reply);
            provider
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(messages.to_vec());
            self.replies
                .lock()
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    struct FakeSearch;

    #[async_trait]
    impl Tool for FakeSearch {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "search_web".into(),
                description: "Search".into(),
                parameters: vec![ParameterSchema::required("query", "string", "Query")],
            }
        }

        async fn execute(&self, arguments: &ToolArguments) -> Result<ToolResult> {
            let query = arguments["query"].as_str().unwrap_or_default();
            Ok(ToolResult::success("search_web", format!("results for {query}")))
        }
    }

    fn agent(provider: Arc<ScriptedProvider>) -> Agent {
        let tools = ToolRegistry::builder().register(FakeSearch).build().unwrap();
        AgentBuilder::new()
            .provider(provider)
            .tools(Arc::new(tools))
            .build()
            .unwrap()
    }

    fn search_call(id: &str) -> ToolCall {
        ToolCall::new(id, "search_web", r#"{"query": "latest AI news"}"#)
    }

    #[test]
    fn test_state_transitions() {
        let policy = AttemptPolicy::new(2);
        assert_eq!(LoopState::start(policy), LoopState::AwaitingModel { attempt: 1 });
        assert_eq!(LoopState::start(AttemptPolicy::new(0)), LoopState::Exhausted);

        let text = Completion::text("4");
        assert_eq!(
            LoopState::after_completion(1, &text, policy),
            LoopState::Done("4".into())
        );

        let tools = Completion::tool_calls(vec![search_call("a")]);
        assert!(matches!(
            LoopState::after_completion(1, &tools, policy),
            LoopState::ExecutingTools { attempt: 1, ref calls } if calls.len() == 1
        ));

        assert_eq!(
            LoopState::after_tools(1, policy),
            LoopState::AwaitingModel { attempt: 2 }
        );
        assert_eq!(LoopState::after_tools(2, policy), LoopState::Exhausted);

        let empty = Completion::text("  ");
        assert_eq!(
            LoopState::after_completion(1, &empty, policy),
            LoopState::AwaitingModel { attempt: 2 }
        );
        assert!(LoopState::Exhausted.is_terminal());
    }

    #[tokio::test]
    async fn test_direct_answer_uses_one_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("4")]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("2+2?"));

        let answer = agent.run(&mut conversation).await.unwrap();
        assert_eq!(answer, "4");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_system_prompt_injected_not_stored() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::text("hi")]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        agent.run(&mut conversation).await.unwrap();

        let seen = provider.seen.lock();
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][0].content, DEFAULT_SYSTEM_PROMPT);
        assert!(conversation.messages().iter().all(|m| m.role != Role::System));
    }

    #[tokio::test]
    async fn test_tool_round_trip_grows_history_by_four() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::tool_calls(vec![search_call("call_1")]),
            Completion::text("Here is the news."),
        ]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("latest AI news today"));

        let answer = agent.run(&mut conversation).await.unwrap();
        assert_eq!(answer, "Here is the news.");
        assert_eq!(provider.call_count(), 2);

        let history = conversation.messages();
        assert_eq!(history.len(), 4);
        assert_eq!(history[1].tool_calls[0].id, "call_1");
        assert_eq!(history[2].role, Role::Tool);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[2].content, "results for latest AI news");

        // The second call sees the tool result
        let seen = provider.seen.lock();
        assert_eq!(seen[1].len(), 4);
    }

    #[tokio::test]
    async fn test_multiple_calls_run_in_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::tool_calls(vec![search_call("a"), search_call("b")]),
            Completion::text("done"),
        ]));
        let agent = agent(provider);

        let mut conversation = Conversation::new();
        conversation.push(Message::user("compare"));
        agent.run(&mut conversation).await.unwrap();

        let ids: Vec<_> = conversation
            .messages()
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_exhausts_after_five_attempts() {
        let provider = Arc::new(ScriptedProvider::repeating(Completion::tool_calls(vec![
            search_call("loop"),
        ])));
        let agent = agent(Arc::clone(&provider));

        let err = agent.ask("never ends").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(5)));
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::tool_calls(vec![
            ToolCall::new("x", "launch_rockets", "{}"),
        ])]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("go"));
        let err = agent.run(&mut conversation).await.unwrap_err();

        assert!(matches!(err, AgentError::ToolNotFound(ref name) if name == "launch_rockets"));
        assert_eq!(provider.call_count(), 1);
        // The assistant turn is kept; nothing is rolled back
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_arguments_abort() {
        let provider = Arc::new(ScriptedProvider::new(vec![Completion::tool_calls(vec![
            ToolCall::new("x", "search_web", "{oops"),
        ])]));
        let agent = agent(provider);

        let err = agent.ask("go").await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let agent = agent(Arc::clone(&provider));

        let err = agent.ask("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_consumes_attempt() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::text(""),
            Completion::text("second try"),
        ]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        let answer = agent.run(&mut conversation).await.unwrap();

        assert_eq!(answer, "second try");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_whitespace_reply_is_not_stored() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Completion::text(" \n "),
            Completion::text("ok"),
        ]));
        let agent = agent(Arc::clone(&provider));

        let mut conversation = Conversation::new();
        conversation.push(Message::user("hello"));
        agent.run(&mut conversation).await.unwrap();

        let contents: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hello", "ok"]);
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
