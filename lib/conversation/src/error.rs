//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `BackendError`: Failures from the live generative backend
//! - `EngineError`: Failures from engine operations
//!
//! The engine absorbs every `BackendError` into a fallback reply, so only
//! `EngineError` ever reaches the transport layer.

use std::fmt;
use voltchat_core::SessionId;

/// Failures from the live generative backend.
///
/// The engine treats every variant identically (substitute a fallback reply
/// and permanently downgrade the session), but the variants keep log output
/// diagnosable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend could not be reached.
    Unreachable { reason: String },
    /// The backend rejected the request (auth, quota, bad request).
    Rejected { status: u16, reason: String },
    /// The backend response could not be parsed.
    ResponseParseFailed { reason: String },
    /// The backend returned no usable candidate text.
    EmptyResponse,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { reason } => {
                write!(f, "backend unreachable: {reason}")
            }
            Self::Rejected { status, reason } => {
                write!(f, "backend rejected request ({status}): {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse backend response: {reason}")
            }
            Self::EmptyResponse => write!(f, "backend returned no candidate text"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Failures from engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No session exists with the given id.
    SessionNotFound { id: SessionId },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { id } => write!(f, "session not found: {id}"),
        }
    }
}

impl std::error::Error for EngineError {}
