use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("invalid input, fields: {0:?}")]
    Validation(Vec<String>),
    #[error("a user with this email already exists")]
    DuplicateKey,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, fields) = match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Invalid input".to_string(),
                Some(fields),
            ),
            ApiError::DuplicateKey => (
                StatusCode::BAD_REQUEST,
                "A user with this email already exists".to_string(),
                None,
            ),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, None),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string(), None),
            ApiError::Internal(detail) => {
                log::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error".to_string(),
                    None,
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                status: "error".to_string(),
                message,
                fields,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey => ApiError::DuplicateKey,
        }
    }
}
