//! Conversation session management.
//!
//! Sessions track active conversations, maintaining message history and the
//! response mode. Mode only ever moves from [`SessionMode::Live`] to
//! [`SessionMode::Fallback`]: once a session degrades it stays degraded for
//! its lifetime, even if the backend later recovers.

use crate::message::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use voltchat_core::SessionId;

/// How replies for a session are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Replies come from the live generative backend.
    Live,
    /// Replies come from the canned keyword responder.
    Fallback,
}

impl SessionMode {
    /// Returns true if this session talks to the live backend.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

/// A conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current response mode.
    pub mode: SessionMode,
    /// Messages exchanged so far. Only consulted in live mode, where it
    /// seeds the backend's conversational context.
    pub history: Vec<Message>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last exchanged a message.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session in the given mode.
    #[must_use]
    pub fn new(mode: SessionMode) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            mode,
            history: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Appends a message to the session history.
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
        self.last_active_at = Utc::now();
    }

    /// Degrades the session to fallback mode. Irreversible.
    pub fn downgrade(&mut self) {
        self.mode = SessionMode::Fallback;
    }

    /// Returns the number of messages in the history.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// In-memory table of sessions, keyed by id.
///
/// Owned by the engine and handed in at construction so tests can observe
/// and seed it directly. Sessions are never evicted; state is ephemeral and
/// lost on process teardown. The lock is only held for short, non-async
/// critical sections.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a new session in the given mode.
    pub fn create(&self, mode: SessionMode) -> Session {
        let session = Session::new(mode);
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .insert(session.id, session.clone());
        session
    }

    /// Returns a snapshot of the session, if it exists.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Returns true if the session exists.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .contains_key(&id)
    }

    /// Sets the session mode. Downgrades only: a fallback session never
    /// returns to live mode, so `set_mode(id, Live)` on a degraded session
    /// is ignored. Unknown ids are ignored.
    pub fn set_mode(&self, id: SessionId, mode: SessionMode) {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        if let Some(session) = sessions.get_mut(&id) {
            match mode {
                SessionMode::Fallback => session.downgrade(),
                SessionMode::Live => {}
            }
        }
    }

    /// Appends a message turn to the session history. Unknown ids are
    /// ignored.
    pub fn append_history(&self, id: SessionId, role: MessageRole, content: impl Into<String>) {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        if let Some(session) = sessions.get_mut(&id) {
            session.add_message(Message::new(role, content));
        }
    }

    /// Number of sessions currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .len()
    }

    /// Returns true if no sessions exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
