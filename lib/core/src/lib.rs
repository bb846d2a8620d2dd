//! Core domain types and utilities for the voltchat service.
//!
//! This crate provides the foundational identifier types and error handling
//! shared by the conversation engine, the Gemini adapter, and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{MessageId, SessionId};
