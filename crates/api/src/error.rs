//! Error types for the HTTP API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use template_manager::TemplateError;
use thiserror::Error;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is malformed or misses a required field.
    #[error("{0}")]
    BadRequest(String),

    /// Template catalog error.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Service construction failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Template(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Template(TemplateError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Template(TemplateError::Database(
                database::DatabaseError::AlreadyExists { .. },
            )) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let body = if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
            serde_json::json!({
                "error": "Internal server error",
                "details": message,
            })
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
            serde_json::json!({
                "error": message
            })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError::Template(TemplateError::Database(
            database::DatabaseError::NotFound {
                entity: "template",
                id: "t1".to_string(),
            },
        ));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::Template(TemplateError::Validation("code is required".into()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let no_version = ApiError::Template(TemplateError::NoApprovedVersion);
        assert_eq!(no_version.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
