//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables
//! (`LISTEN_ADDR`, `STREAM__PACING_MS`, `GEMINI__API_KEY`, ...).

use serde::Deserialize;
use voltchat_gemini::GeminiConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Streaming configuration.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Gemini backend configuration. Absent means the server runs in
    /// fallback mode from the start.
    pub gemini: Option<GeminiConfig>,
}

/// Streaming-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Delay between streamed units, in milliseconds. Presentation pacing
    /// only; it also bounds interruption latency.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_pacing_ms() -> u64 {
    90
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if present configuration is malformed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
