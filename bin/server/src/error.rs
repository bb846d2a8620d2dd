//! Transport error types.
//!
//! Only request-shape errors reach the client as error statuses: missing
//! fields (400) and unknown sessions (404). Backend and generation
//! failures are absorbed inside the engine, so they never surface here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use voltchat_conversation::EngineError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A required request field is missing.
    InvalidRequest { reason: String },
    /// The referenced session does not exist.
    SessionNotFound,
    /// Unrecoverable fault where no fallback reply could be produced.
    Internal,
}

impl ApiError {
    /// Convenience constructor for missing-field errors.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { reason } => write!(f, "{reason}"),
            Self::SessionNotFound => write!(f, "Conversation session not found"),
            Self::Internal => write!(f, "Something went wrong!"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SessionNotFound { .. } => Self::SessionNotFound,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltchat_core::SessionId;

    #[test]
    fn invalid_request_maps_to_400() {
        let err = ApiError::invalid("Session ID and message are required");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn session_not_found_maps_to_404() {
        assert_eq!(ApiError::SessionNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_error_converts_to_404() {
        let err: ApiError = EngineError::SessionNotFound {
            id: SessionId::new(),
        }
        .into();
        assert_eq!(err, ApiError::SessionNotFound);
    }
}
