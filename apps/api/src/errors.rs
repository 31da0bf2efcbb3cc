use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::session::GenerateError;
use crate::vision::VisionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`;
/// this is the single place an error kind is mapped to an HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("{0}")]
    Generation(#[from] GenerateError),

    #[error("{0}")]
    Vision(#[from] VisionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingField(_) | AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::Generation(e) => {
                tracing::error!("generation error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Vision(e) => {
                tracing::error!("vision process error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
