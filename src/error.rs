// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;
use crate::services::cipher::CipherError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Operation {0} not found")]
    InvalidScope(String),

    #[error("Missing required parameter '{param}' for {scope} data")]
    MissingParameter { scope: String, param: &'static str },

    #[error("Fitbit API error: {0}")]
    FitbitApi(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        AppError::Decryption(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::InvalidScope(_) | AppError::MissingParameter { .. } => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(self.to_string()))
            }
            AppError::FitbitApi(msg) => {
                tracing::warn!(error = %msg, "Fitbit API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "fitbit_error",
                    Some(msg.clone()),
                )
            }
            AppError::TokenRefresh(msg) => {
                tracing::warn!(error = %msg, "Token refresh error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "token_refresh_error",
                    Some(msg.clone()),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Decryption(msg) => {
                tracing::error!(error = %msg, "Credential decryption error");
                (StatusCode::INTERNAL_SERVER_ERROR, "decryption_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
