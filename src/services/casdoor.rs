// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Casdoor client: browser-facing URLs and the authorization code exchange.
//!
//! Server-to-server calls go to the internal endpoint; URLs handed to the
//! browser use the external endpoint.

use crate::config::Config;
use crate::error::AppError;
use crate::models::IdentityClaims;
use crate::services::state_store::{state_prefix, StateStore};
use crate::services::token_validator::TokenValidator;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider URL plus the state token embedded in it (empty if none).
#[derive(Debug, Clone, Serialize)]
pub struct AuthUrl {
    pub url: String,
    pub state: String,
}

/// Token endpoint response. Casdoor reports some failures with HTTP 200
/// and an `error` field, so both shapes share one struct.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Casdoor OAuth client.
pub struct CasdoorClient {
    http: reqwest::Client,
    endpoint: String,
    external_endpoint: String,
    client_id: String,
    client_secret: String,
    application: String,
    states: Arc<StateStore>,
    validator: TokenValidator,
}

impl CasdoorClient {
    /// Create a client from configuration, sharing `states` with the
    /// callback handler.
    pub fn new(config: &Config, states: Arc<StateStore>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building Casdoor HTTP client")?;

        let validator = TokenValidator::new(
            &config.casdoor_jwt_key,
            &config.casdoor_client_id,
            config.casdoor_issuer.as_deref(),
        )?;

        tracing::info!(
            endpoint = %config.casdoor_endpoint,
            external_endpoint = %config.casdoor_external_endpoint,
            client_id = %config.casdoor_client_id,
            organization = %config.casdoor_organization,
            application = %config.casdoor_application,
            token_algorithm = ?validator.algorithm(),
            "Casdoor client initialized"
        );

        Ok(Self {
            http,
            endpoint: config.casdoor_endpoint.clone(),
            external_endpoint: config.casdoor_external_endpoint.clone(),
            client_id: config.casdoor_client_id.clone(),
            client_secret: config.casdoor_client_secret.clone(),
            application: config.casdoor_application.clone(),
            states,
            validator,
        })
    }

    // ─── URL Construction ────────────────────────────────────────

    /// Login URL carrying a freshly generated state.
    pub async fn build_login_url(&self, redirect_uri: &str) -> Result<AuthUrl, AppError> {
        require_redirect_uri(redirect_uri)?;

        let state = self.states.generate().await?;
        let url = self.authorize_url("login", redirect_uri, &state);

        tracing::info!(state = %state_prefix(&state), "Generated login URL");
        Ok(AuthUrl { url, state })
    }

    /// Signup URL.
    ///
    /// `password_only` selects the plain signup page, which never calls
    /// back, so no state is generated and the returned state is empty.
    pub async fn build_signup_url(
        &self,
        redirect_uri: &str,
        password_only: bool,
    ) -> Result<AuthUrl, AppError> {
        require_redirect_uri(redirect_uri)?;

        if password_only {
            let url = format!(
                "{}/signup/{}",
                self.external_endpoint,
                urlencoding::encode(&self.application)
            );
            tracing::info!(password_only, "Generated signup URL");
            return Ok(AuthUrl {
                url,
                state: String::new(),
            });
        }

        let state = self.states.generate().await?;
        let url = self.authorize_url("signup", redirect_uri, &state);

        tracing::info!(password_only, state = %state_prefix(&state), "Generated signup URL");
        Ok(AuthUrl { url, state })
    }

    /// Provider-hosted account page, optionally pre-authenticated.
    pub fn build_profile_url(&self, access_token: Option<&str>) -> String {
        match access_token.filter(|t| !t.is_empty()) {
            Some(token) => format!(
                "{}/account?access_token={}",
                self.external_endpoint,
                urlencoding::encode(token)
            ),
            None => format!("{}/account", self.external_endpoint),
        }
    }

    /// `{external}/{flow}/oauth/authorize?...`
    fn authorize_url(&self, flow: &str, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/{}/oauth/authorize?client_id={}&response_type=code&redirect_uri={}&scope=read&state={}",
            self.external_endpoint,
            flow,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    // ─── Token Exchange ──────────────────────────────────────────

    /// Exchange an authorization code for an access token.
    ///
    /// Codes are single-use on the provider side, so a failure here is final.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<String, AppError> {
        let url = format!("{}/api/login/oauth/access_token", self.endpoint);

        tracing::info!(state = %state_prefix(state), "Exchanging authorization code");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token exchange request failed");
                AppError::ExchangeFailed(format!("token request failed: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!(error = %e, "Failed reading token response");
            AppError::ExchangeFailed(format!("reading token response failed: {e}"))
        })?;

        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .as_ref()
                .and_then(describe_error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(status = %status, reason = %reason, "Provider rejected code");
            return Err(AppError::ExchangeFailed(reason));
        }

        let parsed = parsed.ok_or_else(|| {
            AppError::ExchangeFailed("token response is not valid JSON".to_string())
        })?;

        if let Some(reason) = describe_error(&parsed) {
            tracing::warn!(reason = %reason, "Provider rejected code");
            return Err(AppError::ExchangeFailed(reason));
        }

        if parsed.access_token.is_empty() {
            return Err(AppError::ExchangeFailed(
                "token response has no access_token".to_string(),
            ));
        }

        Ok(parsed.access_token)
    }

    /// Verify a provider access token and return its claims.
    pub fn decode_token(&self, access_token: &str) -> Result<IdentityClaims, AppError> {
        self.validator.decode(access_token)
    }
}

fn require_redirect_uri(redirect_uri: &str) -> Result<(), AppError> {
    if redirect_uri.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "redirect_uri is required".to_string(),
        ));
    }
    Ok(())
}

fn describe_error(response: &TokenResponse) -> Option<String> {
    let error = response.error.as_deref().filter(|e| !e.is_empty())?;
    Some(match response.error_description.as_deref() {
        Some(desc) if !desc.is_empty() => format!("{error}: {desc}"),
        _ => error.to_string(),
    })
}
