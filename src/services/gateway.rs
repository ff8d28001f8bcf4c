// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login orchestration.
//!
//! The callback runs `state validated → code exchanged → claims decoded →
//! user synced → session issued`. Each step is its own failure domain and
//! nothing is rolled back: once the state is consumed a later failure ends
//! the login and the client has to start over with a fresh URL.

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::LocalUser;
use crate::services::casdoor::{AuthUrl, CasdoorClient};
use crate::services::session::SessionIssuer;
use crate::services::state_store::StateStore;
use crate::services::user_sync::sync_user;
use serde::Serialize;
use std::sync::Arc;

/// Result of a completed login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// Session token to present as `Authorization: Bearer ...`
    pub token: String,
    pub user: LocalUser,
    /// Provider access token (for provider-hosted pages such as the profile)
    pub access_token: String,
}

/// Authentication gateway shared by all request handlers.
pub struct AuthGateway {
    states: Arc<StateStore>,
    casdoor: CasdoorClient,
    users: UserRepository,
    sessions: SessionIssuer,
}

impl AuthGateway {
    pub fn new(
        states: Arc<StateStore>,
        casdoor: CasdoorClient,
        users: UserRepository,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            states,
            casdoor,
            users,
            sessions,
        }
    }

    pub fn states(&self) -> &Arc<StateStore> {
        &self.states
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub async fn login_url(&self, redirect_uri: &str) -> Result<AuthUrl, AppError> {
        self.casdoor.build_login_url(redirect_uri).await
    }

    pub async fn signup_url(
        &self,
        redirect_uri: &str,
        password_only: bool,
    ) -> Result<AuthUrl, AppError> {
        self.casdoor.build_signup_url(redirect_uri, password_only).await
    }

    pub fn profile_url(&self, access_token: Option<&str>) -> String {
        self.casdoor.build_profile_url(access_token)
    }

    /// Complete a login from the provider callback.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<LoginOutcome, AppError> {
        if code.is_empty() {
            return Err(AppError::InvalidArgument("code is required".to_string()));
        }
        if state.is_empty() {
            return Err(AppError::InvalidArgument("state is required".to_string()));
        }

        self.states.validate(state).await.map_err(|e| {
            tracing::error!(error = %e, "State validation failed");
            AppError::CsrfRejected(e)
        })?;

        let access_token = self.casdoor.exchange_code(code, state).await?;
        let claims = self.casdoor.decode_token(&access_token)?;
        let user = sync_user(&self.users, &claims).await?;
        let token = self.sessions.issue(&user)?;

        tracing::info!(user_id = user.id, username = %user.username, "Login completed");

        Ok(LoginOutcome {
            token,
            user,
            access_token,
        })
    }

    /// Resolve a session token to the current local user.
    ///
    /// Only locally issued session tokens are accepted. After the signature
    /// and expiry check the user is re-read by username, so a deleted or
    /// disabled account stops authenticating immediately.
    pub async fn verify_session(&self, token: &str) -> Result<LocalUser, AppError> {
        let claims = self.sessions.verify(token)?;

        let user = self
            .users
            .get_by_username(&claims.username)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("unknown user".to_string()))?;

        if claims.user_id() != Some(user.id) {
            tracing::warn!(username = %claims.username, "Session user id mismatch");
            return Err(AppError::Unauthenticated(
                "session does not match user".to_string(),
            ));
        }

        if !user.is_active() {
            return Err(AppError::Unauthenticated("account disabled".to_string()));
        }

        Ok(user)
    }
}
