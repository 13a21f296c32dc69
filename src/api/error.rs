use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::services::permissions::PermissionError;
use crate::services::validation::FieldErrors;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    InvalidFields(FieldErrors),

    Unauthorized(String),

    Forbidden(String),

    MethodNotAllowed(String),

    InternalError(String),
}

/// Body of every error response. `fields` only appears for field-level
/// validation failures.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            ApiError::InvalidFields(errors) => write!(f, "Validation error: {errors}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            ApiError::MethodNotAllowed(msg) => write!(f, "Method not allowed: {msg}"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, fields) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    None,
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::InvalidFields(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { error, fields })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::NotAuthenticated => Self::Unauthorized(err.to_string()),
            PermissionError::Forbidden => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        Self::InvalidFields(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::ValidationError(rejection.body_text())
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{resource} {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn field_errors_render_under_fields() {
        let mut errors = FieldErrors::new();
        errors.add("title", "This field is required.");

        let (status, json) = body_json(ApiError::from(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["fields"]["title"][0], "This field is required.");
    }

    #[tokio::test]
    async fn plain_errors_have_no_fields() {
        let (status, json) = body_json(ApiError::not_found("Decision", 7)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Decision 7 not found");
        assert!(json.get("fields").is_none());
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, json) = body_json(ApiError::internal("disk on fire")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "An internal error occurred");
    }

    #[test]
    fn permission_errors_map_to_401_and_403() {
        assert!(matches!(
            ApiError::from(PermissionError::NotAuthenticated),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(PermissionError::Forbidden),
            ApiError::Forbidden(_)
        ));
    }
}
