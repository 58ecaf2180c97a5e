//! Session Management
//!
//! Bounded, in-memory chat sessions keyed by a client-supplied id.
//!
//! Each session sits behind its own async mutex. A request holds that lock
//! for the whole orchestration, so two requests with the same id run one
//! after the other instead of interleaving writes to the same history.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::message::{Conversation, Message};

/// Id used when the client does not send one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Use `raw` verbatim when present, otherwise the default id
    pub fn or_default(raw: Option<&str>) -> Self {
        raw.map(Self::from_string).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::from_string(DEFAULT_SESSION_ID)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history (never contains the system prompt)
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn append(&mut self, message: Message) {
        self.conversation.push(message);
        self.touch();
    }

    /// Keep the last `max_turns` turns, returning how many were dropped
    pub fn truncate(&mut self, max_turns: usize) -> usize {
        self.conversation.truncate_to_last(max_turns)
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

/// Shared, lockable session
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Limits applied by a session store
#[derive(Clone, Debug)]
pub struct SessionPolicy {
    /// Turns kept per session
    pub max_turns: usize,

    /// Sessions idle for longer than this are dropped
    pub idle_ttl: Option<Duration>,

    /// Least recently used sessions are evicted beyond this count
    pub max_sessions: Option<usize>,
}

pub const DEFAULT_MAX_TURNS: usize = 10;

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            idle_ttl: Some(Duration::from_secs(60 * 60)),
            max_sessions: Some(1000),
        }
    }
}

/// Session store injected into request handlers
pub trait SessionStore: Send + Sync {
    /// Limits this store enforces
    fn policy(&self) -> &SessionPolicy;

    /// Fetch a live session, creating an empty one on first reference
    fn get_or_create(&self, id: &SessionId) -> SessionHandle;

    /// Fetch a live session without creating it
    fn get(&self, id: &SessionId) -> Option<SessionHandle>;

    /// Delete a session; returns whether it existed
    fn clear(&self, id: &SessionId) -> bool;

    /// Mark a session as just used; called when a request releases it
    fn touch(&self, id: &SessionId);

    /// Drop sessions idle past the TTL; returns how many were removed
    fn purge_expired(&self) -> usize;

    /// Number of stored sessions
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SessionSlot {
    handle: SessionHandle,
    last_access: Instant,
}

impl SessionSlot {
    /// A request still holds a clone of the handle
    fn is_busy(&self) -> bool {
        Arc::strong_count(&self.handle) > 1
    }
}

/// In-memory session store with idle expiry and LRU eviction
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionSlot>>,
    policy: SessionPolicy,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    pub fn with_policy(policy: SessionPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Idle past the TTL and not held by any request
    fn is_expired(&self, slot: &SessionSlot, now: Instant) -> bool {
        !slot.is_busy()
            && self
                .policy
                .idle_ttl
                .is_some_and(|ttl| now.saturating_duration_since(slot.last_access) > ttl)
    }

    /// Evict the least recently used idle session; `false` when every
    /// session is held by a request
    fn evict_lru(sessions: &mut HashMap<SessionId, SessionSlot>) -> bool {
        let oldest = sessions
            .iter()
            .filter(|(_, slot)| !slot.is_busy())
            .min_by_key(|(_, slot)| slot.last_access)
            .map(|(id, _)| id.clone());

        match oldest {
            Some(id) => {
                tracing::debug!(session = %id, "Evicting least recently used session");
                sessions.remove(&id);
                true
            }
            None => false,
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    fn get_or_create(&self, id: &SessionId) -> SessionHandle {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();

        if let Some(slot) = sessions.get_mut(id) {
            if !self.is_expired(slot, now) {
                slot.last_access = now;
                return Arc::clone(&slot.handle);
            }
        }
        sessions.remove(id);

        if let Some(max) = self.policy.max_sessions {
            sessions.retain(|_, slot| !self.is_expired(slot, now));
            while max > 0 && sessions.len() >= max {
                if !Self::evict_lru(&mut sessions) {
                    tracing::warn!(max, "All sessions busy, exceeding capacity");
                    break;
                }
            }
        }

        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(Session::new(id.clone())));
        sessions.insert(
            id.clone(),
            SessionSlot {
                handle: Arc::clone(&handle),
                last_access: now,
            },
        );
        tracing::debug!(session = %id, "Created session");
        handle
    }

    fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        let now = Instant::now();
        let sessions = self.sessions.lock();
        sessions
            .get(id)
            .filter(|slot| !self.is_expired(slot, now))
            .map(|slot| Arc::clone(&slot.handle))
    }

    fn clear(&self, id: &SessionId) -> bool {
        self.sessions.lock().remove(id).is_some()
    }

    fn touch(&self, id: &SessionId) {
        if let Some(slot) = self.sessions.lock().get_mut(id) {
            slot.last_access = Instant::now();
        }
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, slot| !self.is_expired(slot, now));
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
