//! Chat backend abstraction.
//!
//! The engine only needs one narrow capability from a live generative
//! backend: given the conversation so far and a new user message, produce a
//! complete reply. Authentication, prompting, and transport are the
//! implementor's concern; every failure is reported uniformly as a
//! [`BackendError`] and the engine decides whether to downgrade.

use crate::error::BackendError;
use crate::message::Message;
use async_trait::async_trait;

/// Trait for live chat backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generates a complete reply to `message` given the prior `history`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails for any reason. The
    /// engine never retries; it substitutes a fallback reply instead.
    async fn generate(&self, history: &[Message], message: &str) -> Result<String, BackendError>;

    /// Returns the model identifier, for health reporting.
    fn model(&self) -> &str;
}
