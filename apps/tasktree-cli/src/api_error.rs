//! Mapping of core errors onto HTTP responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tasktree_core::TaskTreeError;
use tracing::error;

/// Message returned for server-side failures; details stay in the logs
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// A [`TaskTreeError`] on its way to the client
#[derive(Debug)]
pub struct ApiError(pub TaskTreeError);

/// Result type for request handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// HTTP status for the wrapped error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TaskTreeError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TaskTreeError::TaskNotFound { .. } | TaskTreeError::ProjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            TaskTreeError::DateConversion { .. } => StatusCode::BAD_REQUEST,
            TaskTreeError::Database(_)
            | TaskTreeError::Serialization(_)
            | TaskTreeError::Io(_)
            | TaskTreeError::Configuration { .. }
            | TaskTreeError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TaskTreeError> for ApiError {
    fn from(error: TaskTreeError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(TaskTreeError::validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.0.kind();
        let message = if status.is_server_error() {
            error!(error = %self.0, kind, "Request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({ "error": { "kind": kind, "message": message } })),
        )
            .into_response()
    }
}
