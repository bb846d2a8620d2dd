//! In-flight reply streams.
//!
//! The controller tracks at most one active output stream per session.
//! Starting a new stream for a session evicts the old one (last begun
//! wins), interruption closes the active stream, and writes to a closed
//! handle are silently dropped. Closure is observed by the emitting task at
//! unit boundaries, so cancellation latency is bounded by one pacing delay.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use voltchat_core::SessionId;

/// Registry entry for an active stream.
#[derive(Debug)]
struct ActiveStream {
    generation: u64,
    open: Arc<AtomicBool>,
}

/// Handle to one in-flight reply stream.
///
/// Held only by the emitting task. The shared `open` flag doubles as the
/// cancellation token: `interrupt` and an evicting `begin` clear it without
/// touching the emitting task directly.
#[derive(Debug)]
pub struct StreamHandle {
    session_id: SessionId,
    generation: u64,
    open: Arc<AtomicBool>,
    sink: mpsc::Sender<String>,
}

impl StreamHandle {
    /// Returns true while chunks may still be written.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// The session this stream belongs to.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

/// Process-wide registry of active reply streams.
#[derive(Debug, Default)]
pub struct StreamController {
    active: Mutex<HashMap<SessionId, ActiveStream>>,
    next_generation: AtomicU64,
}

impl StreamController {
    /// Creates an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new stream for the session, evicting any existing one.
    ///
    /// The evicted stream's consumer sees only stream termination; no error
    /// is raised to it. The new handle writes into `sink`.
    pub fn begin(&self, session_id: SessionId, sink: mpsc::Sender<String>) -> StreamHandle {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let open = Arc::new(AtomicBool::new(true));

        let mut active = self.active.lock().expect("stream registry lock poisoned");
        if let Some(evicted) = active.insert(
            session_id,
            ActiveStream {
                generation,
                open: Arc::clone(&open),
            },
        ) {
            // Last begun wins: the earlier stream stops at its next unit
            // boundary.
            evicted.open.store(false, Ordering::SeqCst);
            tracing::debug!(session_id = %session_id, "evicted active stream");
        }

        StreamHandle {
            session_id,
            generation,
            open,
            sink,
        }
    }

    /// Delivers one unit to the stream's sink.
    ///
    /// Silently drops the unit if the handle has been closed. A sink
    /// failure (the consumer went away) closes the handle. Returns true if
    /// the unit was delivered and the stream remains open.
    pub async fn write(&self, handle: &StreamHandle, unit: impl Into<String>) -> bool {
        if !handle.is_open() {
            return false;
        }
        if handle.sink.send(unit.into()).await.is_err() {
            // Consumer disconnected mid-stream; abort without retry.
            tracing::debug!(session_id = %handle.session_id, "stream sink closed by consumer");
            self.end(handle);
            return false;
        }
        true
    }

    /// Closes the stream and removes it from the active set. Idempotent.
    ///
    /// A handle that has already been superseded by a newer `begin` only
    /// closes itself; it never unregisters its successor.
    pub fn end(&self, handle: &StreamHandle) {
        handle.open.store(false, Ordering::SeqCst);

        let mut active = self.active.lock().expect("stream registry lock poisoned");
        if active
            .get(&handle.session_id)
            .is_some_and(|stream| stream.generation == handle.generation)
        {
            active.remove(&handle.session_id);
        }
    }

    /// Interrupts the session's active stream, if any.
    ///
    /// Returns true when a stream was closed; false when there was nothing
    /// to interrupt (including a second interrupt in a row).
    pub fn interrupt(&self, session_id: SessionId) -> bool {
        let removed = self
            .active
            .lock()
            .expect("stream registry lock poisoned")
            .remove(&session_id);

        match removed {
            Some(stream) => {
                stream.open.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Number of streams currently active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .expect("stream registry lock poisoned")
            .len()
    }
}
