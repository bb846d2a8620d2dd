//! Conversation engine for the voltchat service.
//!
//! This crate provides:
//!
//! - **Session Store**: per-conversation state (mode, history)
//! - **Chat Backend**: the narrow capability contract for a live model
//! - **Fallback Responder**: deterministic keyword-matched canned replies
//! - **Stream Controller**: one cancellable output stream per session
//! - **Conversation Engine**: routing, generation, and paced streaming

pub mod backend;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod message;
pub mod session;
pub mod stream;

pub use backend::ChatBackend;
pub use engine::{ConversationEngine, EngineHealth, SessionStatus, StartedConversation};
pub use error::{BackendError, EngineError};
pub use fallback::{FallbackResponder, SYSTEM_INSTRUCTIONS};
pub use message::{Message, MessageRole};
pub use session::{Session, SessionMode, SessionStore};
pub use stream::{StreamController, StreamHandle};
