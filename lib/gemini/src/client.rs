//! HTTP client for the Gemini generative-language API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use voltchat_conversation::{BackendError, ChatBackend, Message, MessageRole, SYSTEM_INSTRUCTIONS};

/// Default API host.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model identifier.
const DEFAULT_MODEL: &str = "gemini-2.0-flash-live-001";

/// Request timeout. The engine never retries, so a hung call would
/// otherwise stall the exchange indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on generated tokens per reply.
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Configuration for the Gemini backend.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// API key. Absence means the backend is not configured at all.
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API host, overridable for testing.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl GeminiConfig {
    /// Creates a configuration with default model and host.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<WireContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<WireContent>,
}

/// Gemini chat client.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Unreachable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// One-time availability probe, run at startup.
    ///
    /// Fetches the model's metadata; any failure means the process runs
    /// without a live backend and every session starts in fallback mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not reachable with this key.
    pub async fn probe(&self) -> Result<(), BackendError> {
        let url = format!(
            "{}/v1beta/models/{}?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                reason: response.text().await.unwrap_or_default(),
            });
        }

        tracing::info!(model = %self.config.model, "gemini backend available");
        Ok(())
    }
}

/// Builds the wire contents: prior history followed by the new user turn
/// with the system instructions prepended, as the original service did on
/// every send.
fn build_contents(history: &[Message], message: &str) -> Vec<WireContent> {
    let mut contents: Vec<WireContent> = history
        .iter()
        .map(|turn| WireContent {
            role: match turn.role {
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "model".to_string(),
            },
            parts: vec![WirePart {
                text: turn.content.clone(),
            }],
        })
        .collect();

    contents.push(WireContent {
        role: "user".to_string(),
        parts: vec![WirePart {
            text: format!("{SYSTEM_INSTRUCTIONS}\n\nUser message: {message}"),
        }],
    });

    contents
}

/// Extracts the reply text from a response: first candidate, concatenated
/// part texts.
fn extract_text(response: GenerateResponse) -> Result<String, BackendError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn generate(&self, history: &[Message], message: &str) -> Result<String, BackendError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let body = GenerateRequest {
            contents: build_contents(history, message),
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                reason: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        extract_text(parsed)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = GeminiConfig::new("test-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn contents_end_with_instruction_prefixed_user_turn() {
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let contents = build_contents(&history, "tell me more");

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");

        let last = contents.last().unwrap();
        assert_eq!(last.role, "user");
        assert!(last.parts[0].text.starts_with(SYSTEM_INSTRUCTIONS));
        assert!(last.parts[0].text.ends_with("User message: tell me more"));
    }

    #[test]
    fn extract_text_concatenates_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"rider!"}]}}]}"#,
        )
        .expect("parse");

        assert_eq!(extract_text(response).unwrap(), "Hello rider!");
    }

    #[test]
    fn extract_text_rejects_empty_candidates() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[]}"#).expect("parse");
        assert_eq!(extract_text(response).unwrap_err(), BackendError::EmptyResponse);
    }

    #[test]
    fn extract_text_rejects_missing_content() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{}]}"#).expect("parse");
        assert_eq!(extract_text(response).unwrap_err(), BackendError::EmptyResponse);
    }
}
