// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::state_store::StateError;

/// Application error type that converts to HTTP responses.
///
/// Every failure in the login/callback chain is terminal for its request;
/// nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("CSRF protection: {0}")]
    CsrfRejected(#[from] StateError),

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::CsrfRejected(_) => "csrf_rejected",
            AppError::ExchangeFailed(_) => "exchange_failed",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::Persistence(_) => "persistence_error",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::CsrfRejected(_)
            | AppError::InvalidToken(_)
            | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::ExchangeFailed(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Persistence(msg) => {
                tracing::error!(error = %msg, "Persistence error");
                "Persistence error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: self.code(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
