// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification of Casdoor-issued identity tokens.

use crate::error::AppError;
use crate::models::IdentityClaims;
use anyhow::Context;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

const CLOCK_SKEW_SECS: u64 = 60;

/// Verifies signature, expiry, audience and (optionally) issuer of
/// provider tokens and extracts their claims.
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    /// Build a validator from configured key material.
    ///
    /// PEM input selects RS256; anything else is used as an HS256 secret.
    pub fn new(key_material: &str, audience: &str, issuer: Option<&str>) -> anyhow::Result<Self> {
        let (decoding_key, algorithm) = if key_material.contains("-----BEGIN") {
            let key = DecodingKey::from_rsa_pem(key_material.as_bytes())
                .context("invalid RSA public key for identity tokens")?;
            (key, Algorithm::RS256)
        } else {
            (
                DecodingKey::from_secret(key_material.as_bytes()),
                Algorithm::HS256,
            )
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "aud"]);
        validation.set_audience(&[audience]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        validation.leeway = CLOCK_SKEW_SECS;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.validation.algorithms[0]
    }

    /// Decode and verify an identity token.
    pub fn decode(&self, token: &str) -> Result<IdentityClaims, AppError> {
        let data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "token expired".to_string(),
                    ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                    ErrorKind::InvalidAudience => "wrong audience".to_string(),
                    ErrorKind::InvalidIssuer => "wrong issuer".to_string(),
                    _ => format!("decode failed: {e}"),
                };
                tracing::warn!(reason = %reason, "Rejected identity token");
                AppError::InvalidToken(reason)
            },
        )?;

        if data.claims.name.trim().is_empty() {
            return Err(AppError::InvalidToken("missing name claim".to_string()));
        }

        Ok(data.claims)
    }
}
