//! JSON API routes.
//!
//! Request/response shapes mirror the public surface: camelCase JSON
//! bodies, `{"error": ...}` failure bodies, and a chunked `text/plain`
//! body for the streaming endpoint.

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use voltchat_core::SessionId;
use voltchat_conversation::SessionMode;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/start-conversation", post(start_conversation))
        .route("/api/send-message", post(send_message))
        .route("/api/send-message-stream", post(send_message_stream))
        .route("/api/audio-input", post(audio_input))
        .route("/api/interrupt", post(interrupt))
        .route("/api/conversation/{session_id}", get(conversation_status))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    session_id: Option<String>,
    message: Option<String>,
}

impl SendMessageRequest {
    /// Validates presence of both fields and resolves the session id.
    ///
    /// An unparseable id is indistinguishable from an unknown session.
    fn validated(self) -> Result<(SessionId, String, String), ApiError> {
        let raw_id = self
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::invalid("Session ID and message are required"))?;
        let message = self
            .message
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ApiError::invalid("Session ID and message are required"))?;
        let session_id = raw_id.parse().map_err(|_| ApiError::SessionNotFound)?;
        Ok((session_id, raw_id, message))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartConversationResponse {
    session_id: String,
    message: String,
    system_instructions: &'static str,
}

async fn start_conversation(State(state): State<Arc<AppState>>) -> Json<StartConversationResponse> {
    let started = state.engine.start_conversation();
    Json(StartConversationResponse {
        session_id: started.session_id.to_string(),
        message: started.message,
        system_instructions: started.system_instructions,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    response: String,
    session_id: String,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let (session_id, raw_id, message) = request.validated()?;
    let response = state.engine.send_message(session_id, &message).await?;
    Ok(Json(SendMessageResponse {
        response,
        session_id: raw_id,
    }))
}

async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let (session_id, _raw_id, message) = request.validated()?;
    let stream = state
        .engine
        .send_message_stream(session_id, &message)
        .await?;

    // Chunked text/plain; the connection closes when the reply completes
    // or is interrupted.
    let body = Body::from_stream(stream.map(Ok::<String, Infallible>));
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioInputRequest {
    session_id: Option<String>,
    audio_data: Option<String>,
}

async fn audio_input(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AudioInputRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let raw_id = request
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid("Session ID and audio data are required"))?;
    request
        .audio_data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::invalid("Session ID and audio data are required"))?;

    let session_id: SessionId = raw_id.parse().map_err(|_| ApiError::SessionNotFound)?;
    let response = state.engine.audio_input(session_id)?;
    Ok(Json(SendMessageResponse {
        response: response.to_string(),
        session_id: raw_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterruptRequest {
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InterruptResponse {
    success: bool,
    message: &'static str,
    session_id: String,
}

async fn interrupt(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InterruptRequest>,
) -> Result<Json<InterruptResponse>, ApiError> {
    let raw_id = request
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::invalid("Session ID is required"))?;

    // An unparseable id cannot name an active stream; report it the same
    // as a session with nothing to interrupt.
    let success = raw_id
        .parse::<SessionId>()
        .map(|id| state.engine.interrupt(id))
        .unwrap_or(false);

    Ok(Json(InterruptResponse {
        success,
        message: if success {
            "Response interrupted successfully"
        } else {
            "No active response to interrupt"
        },
        session_id: raw_id,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationResponse {
    session_id: String,
    active: bool,
    mode: SessionMode,
    system_instructions: &'static str,
}

async fn conversation_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let id: SessionId = session_id.parse().map_err(|_| ApiError::SessionNotFound)?;
    let status = state.engine.conversation_status(id)?;

    Ok(Json(ConversationResponse {
        session_id,
        active: status.active,
        mode: status.mode,
        system_instructions: state.engine.system_instructions(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    model: String,
    fallback_mode: bool,
    active_sessions: usize,
    active_responses: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.engine.health();
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        model: health.model.unwrap_or_else(|| "not initialized".to_string()),
        fallback_mode: health.fallback_mode,
        active_sessions: health.active_sessions,
        active_responses: health.active_responses,
    })
}
