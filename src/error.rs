//! Error types for Vertex Relay
//!
//! This module defines custom error types used throughout the application.
//! Errors produced by the relay itself are serialized as a flat JSON body;
//! errors produced by the upstream platform are relayed verbatim and never
//! pass through these types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("API key could not be resolved to an upstream project")]
    UnresolvedCredential,

    #[error("Path not found: {0}")]
    UnrecognizedPath(String),

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::UnresolvedCredential => {
                (StatusCode::UNAUTHORIZED, self.to_string(), None)
            }
            AppError::UnrecognizedPath(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::UpstreamUnreachable(e) => (
                StatusCode::BAD_GATEWAY,
                "Failed to reach upstream platform".to_string(),
                Some(e.to_string()),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
