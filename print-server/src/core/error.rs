use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use photo_printer::PrintError;
use serde::Serialize;
use thiserror::Error;

/// Message returned for every failed print request
pub const PRINT_FAILED: &str = "Failed to print";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Print job not found")]
    JobNotFound,

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::JobNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Print(err) => {
                // The cause is logged, callers only ever see the generic message
                tracing::error!(kind = err.kind(), error = %err, "Print request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, PRINT_FAILED.to_string())
            }
            ServerError::Internal(err) => {
                tracing::error!(error = ?err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, PRINT_FAILED.to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, ServerError>;
