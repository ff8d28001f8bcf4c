// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Locally signed session tokens.

use crate::error::AppError;
use crate::models::LocalUser;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Issuer stamped into every session token.
pub const SESSION_ISSUER: &str = "context-id-gateway";

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (local user ID)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

impl SessionClaims {
    pub fn user_id(&self) -> Option<u64> {
        self.sub.parse().ok()
    }
}

/// Issues and verifies HS256 session tokens.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(signing_key: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            ttl,
        }
    }

    /// Create a session token for a synced user.
    pub fn issue(&self, user: &LocalUser) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp().max(0) as usize;

        let claims = SessionClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            iss: SESSION_ISSUER.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Verify signature, issuer and expiry of a session token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[SESSION_ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthenticated(format!("invalid session token: {e}")))
    }
}
