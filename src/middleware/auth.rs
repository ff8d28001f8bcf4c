// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::models::LocalUser;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub LocalUser);

/// Middleware that requires a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("invalid Authorization header".to_string()))?;

    let token = parse_bearer(header_value).ok_or_else(|| {
        AppError::Unauthenticated("Authorization header must be a Bearer token".to_string())
    })?;

    let user = state.gateway.verify_session(token).await.map_err(|e| {
        tracing::warn!(error = %e, "Session verification failed");
        e
    })?;

    request.extensions_mut().insert(AuthUser(user));

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization` header value.
///
/// `Bearer <token>` (scheme case-insensitive) yields `<token>`. A value with
/// no whitespace at all is taken as a raw token. Any other scheme, or an
/// empty token, yields `None`.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let value = value.trim();

    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if value.eq_ignore_ascii_case("bearer") => return None,
        None => value,
    };

    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token)
}
