// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::LocalUser;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require a session token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/user", get(get_current_user))
        .route("/api/v1/auth/profile-url", get(get_profile_url))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: LocalUser,
}

/// Get current user profile.
async fn get_current_user(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse { user })
}

#[derive(Deserialize)]
pub struct ProfileUrlParams {
    /// Provider access token returned by the callback
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileUrlResponse {
    pub profile_url: String,
}

/// Provider-hosted profile page for the current user.
async fn get_profile_url(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<ProfileUrlParams>,
) -> Result<Json<ProfileUrlResponse>> {
    let profile_url = state.gateway.profile_url(params.access_token.as_deref());

    tracing::info!(user_id = user.id, "Generated profile URL");

    Ok(Json(ProfileUrlResponse { profile_url }))
}
