//! API error types and responses.
//!
//! Every failed request answers with `{"error": {"code", "message"}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use prismer_agent::AgentError;
use prismer_core::IdError;
use prismer_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or parameters.
    #[error("{0}")]
    BadRequest(String),

    /// A path resolved outside the workspace.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The agent ran but failed.
    #[error("{0}")]
    Agent(String),

    /// The agent could not be started.
    #[error("{0}")]
    Spawn(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Agent(_) | Self::Spawn(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::InvalidPath(_) => "invalid_path",
            Self::NotFound(_) => "not_found",
            Self::Agent(_) => "agent_error",
            Self::Spawn(_) => "spawn_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("no such file or session".to_string()),
            StoreError::InvalidPath(path) => Self::InvalidPath(path),
            StoreError::Database(_) | StoreError::Serialization(_) | StoreError::Io(_) => {
                tracing::error!(error = %err, "Store error");
                Self::Internal("storage error".to_string())
            }
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidRequest(msg) => Self::BadRequest(msg),
            AgentError::Spawn(msg) => Self::Spawn(format!("Failed to start agent: {msg}")),
            AgentError::Exited { message, .. } => Self::Agent(message),
            AgentError::Io(e) => {
                tracing::error!(error = %e, "Agent io error");
                Self::Agent(format!("Failed to read agent output: {e}"))
            }
        }
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::BadRequest(format!("invalid session ID: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidPath("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Spawn("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(ApiError::InvalidPath("x".into()).code(), "invalid_path");
        assert_eq!(ApiError::Agent("x".into()).code(), "agent_error");
        assert_eq!(ApiError::Spawn("x".into()).code(), "spawn_error");
        assert_eq!(ApiError::Internal("x".into()).code(), "internal_error");
    }

    #[test]
    fn store_errors_map() {
        assert_eq!(ApiError::from(StoreError::NotFound).code(), "not_found");
        assert_eq!(
            ApiError::from(StoreError::InvalidPath("../etc".into())).code(),
            "invalid_path"
        );
        assert_eq!(
            ApiError::from(StoreError::Database("boom".into())).code(),
            "internal_error"
        );
    }

    #[test]
    fn agent_errors_map() {
        let err = ApiError::from(AgentError::Exited {
            code: Some(1),
            message: "Agent exited with code 1".into(),
        });
        assert_eq!(err.code(), "agent_error");
        assert_eq!(err.to_string(), "Agent exited with code 1");
        assert_eq!(
            ApiError::from(AgentError::Spawn("ENOENT".into())).to_string(),
            "Failed to start agent: ENOENT"
        );
    }
}
