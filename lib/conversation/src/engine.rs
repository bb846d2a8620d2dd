//! Conversation orchestration.
//!
//! The engine routes each exchange: validate the session, generate a reply
//! (live backend with transparent fallback, or fallback directly), and for
//! the streaming path emit the reply unit by unit through the stream
//! controller with a pacing delay between units.
//!
//! Guiding policy: once session identity is valid, the user-visible
//! exchange never fails. Every backend error is absorbed into a fallback
//! reply and the session is permanently degraded.

use crate::backend::ChatBackend;
use crate::error::EngineError;
use crate::fallback::{
    AUDIO_PLACEHOLDER, FallbackResponder, GREETING_PROMPT, GREETING_REPLY, SYSTEM_INSTRUCTIONS,
};
use crate::message::MessageRole;
use crate::session::{SessionMode, SessionStore};
use crate::stream::StreamController;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use voltchat_core::SessionId;

/// Default delay between streamed units. Presentation pacing only; it
/// simulates incremental typing and bounds interruption latency.
pub const DEFAULT_PACING: Duration = Duration::from_millis(90);

/// Buffered units between the emitting task and the transport.
const STREAM_BUFFER: usize = 32;

/// Result of starting a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct StartedConversation {
    /// The new session's id.
    pub session_id: SessionId,
    /// Human-readable confirmation.
    pub message: String,
    /// The system instructions in effect for the session.
    pub system_instructions: &'static str,
}

/// Snapshot of one session's state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// The session's id.
    pub session_id: SessionId,
    /// Whether the session accepts messages. Sessions are never torn down
    /// while the process lives, so this is always true for a known id.
    pub active: bool,
    /// Current response mode.
    pub mode: SessionMode,
}

/// Engine-level health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    /// Model identifier of the live backend, if one is configured.
    pub model: Option<String>,
    /// True when no live backend is available and every session starts
    /// degraded.
    pub fallback_mode: bool,
    /// Sessions currently held in memory.
    pub active_sessions: usize,
    /// Reply streams currently emitting.
    pub active_responses: usize,
}

/// Orchestrates sessions, reply generation, and streaming.
pub struct ConversationEngine {
    sessions: Arc<SessionStore>,
    streams: Arc<StreamController>,
    backend: Option<Arc<dyn ChatBackend>>,
    fallback: FallbackResponder,
    pacing: Duration,
}

impl ConversationEngine {
    /// Creates an engine over the given tables and optional live backend.
    ///
    /// `backend` is `None` when the startup probe failed; every session
    /// then starts in fallback mode.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        streams: Arc<StreamController>,
        backend: Option<Arc<dyn ChatBackend>>,
        pacing: Duration,
    ) -> Self {
        Self {
            sessions,
            streams,
            backend,
            fallback: FallbackResponder::new(),
            pacing,
        }
    }

    /// Starts a new conversation session. Never fails.
    ///
    /// Live-mode sessions are seeded with the canned greeting exchange so
    /// the backend has conversational context from the first message.
    pub fn start_conversation(&self) -> StartedConversation {
        let mode = if self.backend.is_some() {
            SessionMode::Live
        } else {
            SessionMode::Fallback
        };
        let session = self.sessions.create(mode);

        if mode.is_live() {
            self.sessions
                .append_history(session.id, MessageRole::User, GREETING_PROMPT);
            self.sessions
                .append_history(session.id, MessageRole::Assistant, GREETING_REPLY);
        }

        tracing::info!(session_id = %session.id, mode = ?mode, "conversation started");

        StartedConversation {
            session_id: session.id,
            message: "Conversation started successfully".to_string(),
            system_instructions: SYSTEM_INSTRUCTIONS,
        }
    }

    /// Generates a complete reply for the message.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    /// Backend failures never surface: the reply degrades to fallback text
    /// and the session is downgraded for good.
    pub async fn send_message(
        &self,
        session_id: SessionId,
        message: &str,
    ) -> Result<String, EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(EngineError::SessionNotFound { id: session_id })?;

        let reply = match (&self.backend, session.mode) {
            (Some(backend), SessionMode::Live) => {
                match backend.generate(&session.history, message).await {
                    Ok(text) => {
                        self.sessions
                            .append_history(session_id, MessageRole::User, message);
                        self.sessions
                            .append_history(session_id, MessageRole::Assistant, &text);
                        text
                    }
                    Err(err) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %err,
                            "backend call failed; session degraded to fallback"
                        );
                        self.sessions.set_mode(session_id, SessionMode::Fallback);
                        self.fallback.respond(message).to_string()
                    }
                }
            }
            // Degraded sessions never attempt the backend again.
            _ => self.fallback.respond(message).to_string(),
        };

        Ok(reply)
    }

    /// Generates a reply and emits it as a paced unit stream.
    ///
    /// Units are whitespace-delimited tokens of the reply, each written
    /// with one trailing space. The emitting task re-checks the stream
    /// handle at every unit boundary, so an interrupt (or an evicting
    /// second stream) halts emission within one pacing interval.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    pub async fn send_message_stream(
        &self,
        session_id: SessionId,
        message: &str,
    ) -> Result<ReceiverStream<String>, EngineError> {
        let reply = self.send_message(session_id, message).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let handle = self.streams.begin(session_id, tx);
        let streams = Arc::clone(&self.streams);
        let pacing = self.pacing;
        let units: Vec<String> = reply
            .split_whitespace()
            .map(|unit| format!("{unit} "))
            .collect();

        tokio::spawn(async move {
            for unit in units {
                if !handle.is_open() {
                    break;
                }
                if !streams.write(&handle, unit).await {
                    break;
                }
                tokio::time::sleep(pacing).await;
            }
            streams.end(&handle);
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Interrupts the session's active stream, if any.
    ///
    /// Returns true when a stream was halted; false when there was nothing
    /// to interrupt. Idempotent.
    pub fn interrupt(&self, session_id: SessionId) -> bool {
        let interrupted = self.streams.interrupt(session_id);
        if interrupted {
            tracing::info!(session_id = %session_id, "stream interrupted");
        }
        interrupted
    }

    /// Canned acknowledgement for audio input, which is not yet decoded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    pub fn audio_input(&self, session_id: SessionId) -> Result<&'static str, EngineError> {
        if !self.sessions.contains(session_id) {
            return Err(EngineError::SessionNotFound { id: session_id });
        }
        Ok(AUDIO_PLACEHOLDER)
    }

    /// Reports the session's current state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] for an unknown session.
    pub fn conversation_status(&self, session_id: SessionId) -> Result<SessionStatus, EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or(EngineError::SessionNotFound { id: session_id })?;

        Ok(SessionStatus {
            session_id,
            active: true,
            mode: session.mode,
        })
    }

    /// Engine-level health snapshot.
    #[must_use]
    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            model: self.backend.as_ref().map(|b| b.model().to_string()),
            fallback_mode: self.backend.is_none(),
            active_sessions: self.sessions.len(),
            active_responses: self.streams.active_count(),
        }
    }

    /// The system instructions in effect.
    #[must_use]
    pub fn system_instructions(&self) -> &'static str {
        SYSTEM_INSTRUCTIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::message::Message;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_stream::StreamExt;

    /// Backend that replies with a fixed multi-unit text.
    struct CannedBackend {
        reply: &'static str,
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        async fn generate(
            &self,
            _history: &[Message],
            _message: &str,
        ) -> Result<String, BackendError> {
            Ok(self.reply.to_string())
        }

        fn model(&self) -> &str {
            "canned-test-model"
        }
    }

    /// Backend that fails on the first call and succeeds afterwards, to
    /// prove the downgrade outlives backend recovery.
    struct RecoveringBackend {
        failed_once: AtomicBool,
    }

    impl RecoveringBackend {
        fn new() -> Self {
            Self {
                failed_once: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for RecoveringBackend {
        async fn generate(
            &self,
            _history: &[Message],
            _message: &str,
        ) -> Result<String, BackendError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(BackendError::Unreachable {
                    reason: "connection refused".to_string(),
                });
            }
            Ok("recovered live reply".to_string())
        }

        fn model(&self) -> &str {
            "recovering-test-model"
        }
    }

    fn engine_with(backend: Option<Arc<dyn ChatBackend>>, pacing: Duration) -> ConversationEngine {
        ConversationEngine::new(
            Arc::new(SessionStore::new()),
            Arc::new(StreamController::new()),
            backend,
            pacing,
        )
    }

    fn live_engine(reply: &'static str) -> ConversationEngine {
        engine_with(
            Some(Arc::new(CannedBackend { reply })),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn start_conversation_is_live_with_backend() {
        let engine = live_engine("hello");
        let started = engine.start_conversation();

        let status = engine
            .conversation_status(started.session_id)
            .expect("session exists");
        assert_eq!(status.mode, SessionMode::Live);
        assert!(status.active);
        assert_eq!(started.system_instructions, SYSTEM_INSTRUCTIONS);
    }

    #[tokio::test]
    async fn start_conversation_falls_back_without_backend() {
        let engine = engine_with(None, Duration::from_millis(1));
        let started = engine.start_conversation();

        let status = engine.conversation_status(started.session_id).unwrap();
        assert_eq!(status.mode, SessionMode::Fallback);
    }

    #[tokio::test]
    async fn send_message_returns_backend_text() {
        let engine = live_engine("the live answer");
        let started = engine.start_conversation();

        let reply = engine
            .send_message(started.session_id, "anything")
            .await
            .expect("reply");
        assert_eq!(reply, "the live answer");
    }

    #[tokio::test]
    async fn send_message_unknown_session_fails() {
        let engine = live_engine("x");
        let err = engine
            .send_message(SessionId::new(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn backend_failure_degrades_session_permanently() {
        let engine = engine_with(
            Some(Arc::new(RecoveringBackend::new())),
            Duration::from_millis(1),
        );
        let started = engine.start_conversation();
        let fallback = FallbackResponder::new();

        // First call: backend fails, reply degrades to fallback text.
        let first = engine
            .send_message(started.session_id, "What are the specifications?")
            .await
            .unwrap();
        assert_eq!(first, fallback.respond("What are the specifications?"));

        let status = engine.conversation_status(started.session_id).unwrap();
        assert_eq!(status.mode, SessionMode::Fallback);

        // Backend has recovered, but the session stays degraded.
        let second = engine
            .send_message(started.session_id, "Where can I find a dealer?")
            .await
            .unwrap();
        assert_eq!(second, fallback.respond("Where can I find a dealer?"));
    }

    #[tokio::test]
    async fn new_sessions_are_unaffected_by_another_sessions_downgrade() {
        let engine = engine_with(
            Some(Arc::new(RecoveringBackend::new())),
            Duration::from_millis(1),
        );
        let degraded = engine.start_conversation();
        engine.send_message(degraded.session_id, "hi").await.unwrap();

        // A fresh session still starts live.
        let fresh = engine.start_conversation();
        let status = engine.conversation_status(fresh.session_id).unwrap();
        assert_eq!(status.mode, SessionMode::Live);
    }

    #[tokio::test]
    async fn live_exchange_appends_history() {
        let sessions = Arc::new(SessionStore::new());
        let engine = ConversationEngine::new(
            Arc::clone(&sessions),
            Arc::new(StreamController::new()),
            Some(Arc::new(CannedBackend {
                reply: "answer text",
            })),
            Duration::from_millis(1),
        );
        let started = engine.start_conversation();

        engine
            .send_message(started.session_id, "question")
            .await
            .unwrap();

        // Greeting pair plus the new user/assistant pair.
        let session = sessions.get(started.session_id).unwrap();
        assert_eq!(session.message_count(), 4);
        assert_eq!(session.history[2].content, "question");
        assert_eq!(session.history[3].content, "answer text");
    }

    #[tokio::test]
    async fn streaming_emits_every_unit_in_order() {
        let engine = live_engine("alpha beta gamma delta");
        let started = engine.start_conversation();

        let stream = engine
            .send_message_stream(started.session_id, "go")
            .await
            .expect("stream");
        let units: Vec<String> = stream.collect().await;

        assert_eq!(units, vec!["alpha ", "beta ", "gamma ", "delta "]);
    }

    #[tokio::test]
    async fn stream_closes_after_completion() {
        let engine = live_engine("one two");
        let started = engine.start_conversation();

        let stream = engine
            .send_message_stream(started.session_id, "go")
            .await
            .unwrap();
        let _units: Vec<String> = stream.collect().await;

        assert_eq!(engine.health().active_responses, 0);
        // The completed stream is no longer interruptible.
        assert!(!engine.interrupt(started.session_id));
    }

    #[tokio::test]
    async fn interrupt_halts_emission_at_unit_boundary() {
        // Long reply, generous pacing: interruption must cut it short.
        let engine = engine_with(
            Some(Arc::new(CannedBackend {
                reply: "u u u u u u u u u u u u u u u u u u u u u u u u u u u u u u",
            })),
            Duration::from_millis(50),
        );
        let started = engine.start_conversation();

        let mut stream = engine
            .send_message_stream(started.session_id, "go")
            .await
            .unwrap();

        // Take two units, then interrupt.
        let mut received = Vec::new();
        received.push(stream.next().await.expect("first unit"));
        received.push(stream.next().await.expect("second unit"));

        assert!(engine.interrupt(started.session_id));

        // Drain whatever was already in flight; the stream must close well
        // short of the full 30 units (at most one unit after the
        // interrupt).
        while let Some(unit) = stream.next().await {
            received.push(unit);
        }
        assert!(received.len() <= 3, "got {} units", received.len());

        // A second interrupt finds nothing.
        assert!(!engine.interrupt(started.session_id));
    }

    #[tokio::test]
    async fn second_stream_evicts_first() {
        let engine = engine_with(
            Some(Arc::new(CannedBackend {
                reply: "w w w w w w w w w w w w w w w w w w w w",
            })),
            Duration::from_millis(20),
        );
        let started = engine.start_conversation();

        let mut first = engine
            .send_message_stream(started.session_id, "go")
            .await
            .unwrap();
        // Wait for the first stream to actually start emitting.
        first.next().await.expect("first stream emits");

        let second = engine
            .send_message_stream(started.session_id, "go")
            .await
            .unwrap();

        // The first stream terminates without delivering all units.
        let mut first_units = 1;
        while first.next().await.is_some() {
            first_units += 1;
        }
        assert!(first_units < 20, "first stream delivered {first_units} units");

        // The second stream completes in full.
        let second_units: Vec<String> = second.collect().await;
        assert_eq!(second_units.len(), 20);
    }

    #[tokio::test]
    async fn audio_input_returns_placeholder_for_known_session() {
        let engine = engine_with(None, Duration::from_millis(1));
        let started = engine.start_conversation();

        let reply = engine.audio_input(started.session_id).expect("reply");
        assert!(reply.contains("audio"));

        let err = engine.audio_input(SessionId::new()).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn health_reports_backend_and_counts() {
        let engine = live_engine("hi");
        engine.start_conversation();
        engine.start_conversation();

        let health = engine.health();
        assert_eq!(health.model.as_deref(), Some("canned-test-model"));
        assert!(!health.fallback_mode);
        assert_eq!(health.active_sessions, 2);
        assert_eq!(health.active_responses, 0);

        let degraded = engine_with(None, Duration::from_millis(1));
        assert!(degraded.health().fallback_mode);
        assert!(degraded.health().model.is_none());
    }

    #[tokio::test]
    async fn conversation_status_unknown_session_fails() {
        let engine = engine_with(None, Duration::from_millis(1));
        let err = engine.conversation_status(SessionId::new()).unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound { .. }));
    }
}
