//! Application State

use std::sync::Arc;

use tedai_core::{Agent, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Orchestration loop with the provider and frozen tool registry
    pub agent: Arc<Agent>,

    /// Per-session conversation history
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(agent: Agent, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            agent: Arc::new(agent),
            sessions,
        }
    }
}
