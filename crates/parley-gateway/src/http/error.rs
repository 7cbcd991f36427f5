//! Error type for HTTP handlers and its status-code mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_agent::PipelineError;
use parley_store::StoreError;
use serde_json::json;
use tracing::{error, warn};

/// Failure surfaced at the request boundary. Each variant maps to its own
/// status code so callers can tell storage, provider and input problems apart.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed caller input.
    Validation(String),
    /// Admin token missing or wrong.
    Unauthorized(String),
    /// No persona by that name.
    UnknownPersona(String),
    /// The conversation store failed.
    Storage(StoreError),
    /// The completion provider failed.
    Completion(String),
}

impl ApiError {
    /// Short error code string included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::UnknownPersona(_) => "UNKNOWN_PERSONA",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Completion(_) => "COMPLETION_ERROR",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Storage(e)
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Storage { source, .. } => Self::Storage(source),
            PipelineError::Completion(e) => Self::Completion(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs; callers get a generic message.
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::UnknownPersona(name) => {
                (StatusCode::NOT_FOUND, format!("unknown persona: {name}"))
            }
            Self::Storage(e) => {
                error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage unavailable".to_string(),
                )
            }
            Self::Completion(e) => {
                warn!(error = %e, "completion failure");
                (StatusCode::BAD_GATEWAY, "completion failed".to_string())
            }
        };

        (
            status,
            Json(json!({"error": message, "code": self.code()})),
        )
            .into_response()
    }
}
