//! voltchat HTTP server.
//!
//! Thin axum transport over the conversation engine: JSON routes, a
//! chunked streaming body for incremental replies, CORS, and request
//! tracing.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
