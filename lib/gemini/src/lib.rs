//! Gemini live-backend adapter.
//!
//! Implements the conversation engine's [`ChatBackend`] contract against
//! the Gemini `generateContent` REST surface. The engine only ever sees a
//! uniform [`BackendError`]; transport, auth, quota, and parse failures are
//! not distinguished upstream of the log line.

pub mod client;

pub use client::{GeminiClient, GeminiConfig};
