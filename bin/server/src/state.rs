//! Shared application state.

use voltchat_conversation::ConversationEngine;

/// State shared by every request handler.
pub struct AppState {
    /// The conversation engine; owns the session and stream tables.
    pub engine: ConversationEngine,
}

impl AppState {
    /// Creates application state around an engine.
    #[must_use]
    pub fn new(engine: ConversationEngine) -> Self {
        Self { engine }
    }
}
