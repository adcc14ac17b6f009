//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type for the management HTTP surface
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The addressed session does not exist or is already closed.
    #[error("connection {0} is gone")]
    Gone(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body returned for a missing or closed connection
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoneResponse {
    pub message: &'static str,
    pub connection_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Gone(connection_id) => (
                StatusCode::GONE,
                Json(GoneResponse {
                    message: "Gone",
                    connection_id,
                }),
            )
                .into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
