// =============================================================================
// Orrery API - Error Types
// =============================================================================

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orrery_engine::EngineError;
use serde_json::json;

/// API error type. Every variant maps to one HTTP status and one error kind.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Simulation not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidParameter(msg.into())
    }

    /// Machine-readable kind, sent as the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidParameter(_) => "invalid_parameter",
            ApiError::Engine(_) => "engine_error",
            ApiError::Io(_) => "io_error",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Io(io) => ApiError::Io(io),
            e if e.is_caller_error() => ApiError::InvalidParameter(e.to_string()),
            e => ApiError::Engine(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("simulation worker failed: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Engine(msg) => tracing::error!("Engine error: {}", msg),
            ApiError::Io(e) => tracing::error!("IO error: {:?}", e),
            ApiError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            ApiError::NotFound(_) | ApiError::InvalidParameter(_) => {
                tracing::debug!(status = %status, "{}", self)
            }
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
