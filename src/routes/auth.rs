// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Casdoor OAuth authentication routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::services::LoginOutcome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/auth/login-url", get(login_url))
        .route("/api/v1/auth/signup-url", get(signup_url))
        .route(
            "/api/v1/auth/callback",
            get(callback_query).post(callback_json),
        )
        .route("/api/v1/auth/login", post(callback_json))
        .route("/api/v1/auth/logout", post(logout))
}

/// Query parameters for the login URL.
#[derive(Deserialize)]
pub struct LoginUrlParams {
    #[serde(default)]
    redirect_uri: Option<String>,
}

#[derive(Serialize)]
pub struct LoginUrlResponse {
    pub login_url: String,
    pub state: String,
}

/// Build the provider login URL with a fresh state.
async fn login_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginUrlParams>,
) -> Result<Json<LoginUrlResponse>> {
    let redirect_uri = params.redirect_uri.unwrap_or_default();
    let auth = state.gateway.login_url(&redirect_uri).await?;

    Ok(Json(LoginUrlResponse {
        login_url: auth.url,
        state: auth.state,
    }))
}

#[derive(Deserialize)]
pub struct SignupUrlParams {
    #[serde(default)]
    redirect_uri: Option<String>,
    /// Plain password signup page (no OAuth round trip)
    #[serde(default)]
    enable_password: bool,
}

#[derive(Serialize)]
pub struct SignupUrlResponse {
    pub signup_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
}

async fn signup_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SignupUrlParams>,
) -> Result<Json<SignupUrlResponse>> {
    let redirect_uri = params.redirect_uri.unwrap_or_default();
    let auth = state
        .gateway
        .signup_url(&redirect_uri, params.enable_password)
        .await?;

    Ok(Json(SignupUrlResponse {
        signup_url: auth.url,
        state: auth.state,
    }))
}

/// Callback parameters, from the query string or a JSON body.
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackParams {
    #[serde(default)]
    #[validate(length(min = 1, message = "code is required"))]
    code: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "state is required"))]
    state: String,
}

async fn callback_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LoginOutcome>> {
    complete_login(&state, params).await
}

/// A missing or unparseable body counts as missing parameters.
async fn callback_json(
    State(state): State<Arc<AppState>>,
    params: std::result::Result<Json<CallbackParams>, JsonRejection>,
) -> Result<Json<LoginOutcome>> {
    let Json(params) = params.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    complete_login(&state, params).await
}

/// Exchange the code, sync the user and return a session token.
async fn complete_login(state: &AppState, params: CallbackParams) -> Result<Json<LoginOutcome>> {
    params
        .validate()
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

    let outcome = state
        .gateway
        .handle_callback(&params.code, &params.state)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, code = e.code(), "Login failed");
            e
        })?;

    Ok(Json(outcome))
}

/// Logout. Sessions are stateless; the client drops its token.
async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}
