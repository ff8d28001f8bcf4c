// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration, resolved once at startup.
//!
//! Each key is resolved with the precedence: process environment, then the
//! `.env` file (loaded without overriding the environment), then the
//! built-in default. Keys without a default are required.

use std::env;
use std::path::Path;
use std::time::Duration;

/// Public key file used when `CASDOOR_JWT_SECRET` is not set.
pub const DEFAULT_JWT_KEY_PATH: &str = "./certs/token_jwt_public_key.pem";

/// Minimum length of the session signing key.
const MIN_SESSION_KEY_LEN: usize = 32;

/// Backend used for local user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStoreKind {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Casdoor ---
    /// Endpoint used for server-to-server calls (token exchange).
    pub casdoor_endpoint: String,
    /// Endpoint placed in browser-facing URLs.
    pub casdoor_external_endpoint: String,
    pub casdoor_client_id: String,
    pub casdoor_client_secret: String,
    /// PEM public key (RS256) or shared secret (HS256) for identity tokens.
    pub casdoor_jwt_key: String,
    pub casdoor_organization: String,
    pub casdoor_application: String,
    /// Expected `iss` of identity tokens; unchecked when `None`.
    pub casdoor_issuer: Option<String>,

    // --- Sessions ---
    /// HS256 key for locally issued session tokens (raw bytes)
    pub session_signing_key: Vec<u8>,
    pub session_ttl: Duration,

    // --- Server ---
    /// Public URL of this application (allowed CORS origin)
    pub external_url: String,
    pub port: u16,
    /// Timeout applied to every call to the identity provider
    pub http_timeout: Duration,

    // --- Storage ---
    pub user_store: UserStoreKind,
    pub gcp_project_id: String,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            casdoor_endpoint: "http://localhost:8000".to_string(),
            casdoor_external_endpoint: "http://localhost:8000".to_string(),
            casdoor_client_id: "test_client_id".to_string(),
            casdoor_client_secret: "test_client_secret".to_string(),
            casdoor_jwt_key: "test_provider_secret_32_bytes_long!".to_string(),
            casdoor_organization: "hello".to_string(),
            casdoor_application: "context-ID-DEV".to_string(),
            casdoor_issuer: None,
            session_signing_key: b"test_session_key_32_bytes_minimum!!".to_vec(),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            external_url: "http://localhost:8080".to_string(),
            port: 8080,
            http_timeout: Duration::from_secs(5),
            user_store: UserStoreKind::Memory,
            gcp_project_id: "test-project".to_string(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let casdoor_endpoint = get("CASDOOR_ENDPOINT")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let casdoor_external_endpoint = get("APP_CASDOOR_EXTERNAL_URL")
            .or_else(|| get("CASDOOR_EXTERNAL_ENDPOINT"))
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| casdoor_endpoint.clone());

        let casdoor_jwt_key = match get("CASDOOR_JWT_SECRET") {
            Some(raw) => load_key_material(&raw),
            None if Path::new(DEFAULT_JWT_KEY_PATH).exists() => {
                tracing::info!(path = DEFAULT_JWT_KEY_PATH, "Using default JWT public key file");
                load_key_material(DEFAULT_JWT_KEY_PATH)
            }
            None => return Err(ConfigError::Missing("CASDOOR_JWT_SECRET")),
        };
        if casdoor_jwt_key.is_empty() {
            return Err(ConfigError::Invalid {
                key: "CASDOOR_JWT_SECRET",
                reason: "key material is empty".to_string(),
            });
        }

        let session_signing_key = required("SESSION_SIGNING_KEY")?.into_bytes();
        if session_signing_key.len() < MIN_SESSION_KEY_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SIGNING_KEY",
                reason: format!("must be at least {MIN_SESSION_KEY_LEN} bytes"),
            });
        }

        let user_store = match get("USER_STORE").as_deref().map(str::trim) {
            None | Some("firestore") => UserStoreKind::Firestore,
            Some("memory") => UserStoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "USER_STORE",
                    reason: format!("unknown store {other:?} (expected firestore or memory)"),
                })
            }
        };

        Ok(Self {
            casdoor_endpoint,
            casdoor_external_endpoint,
            casdoor_client_id: required("CASDOOR_CLIENT_ID")?.trim().to_string(),
            casdoor_client_secret: required("CASDOOR_CLIENT_SECRET")?.trim().to_string(),
            casdoor_jwt_key,
            casdoor_organization: get("CASDOOR_ORGANIZATION_NAME")
                .unwrap_or_else(|| "hello".to_string()),
            casdoor_application: get("CASDOOR_APPLICATION_NAME")
                .unwrap_or_else(|| "context-ID-DEV".to_string()),
            casdoor_issuer: get("CASDOOR_ISSUER"),
            session_signing_key,
            session_ttl: Duration::from_secs(
                parse_or("SESSION_TTL_HOURS", get("SESSION_TTL_HOURS"), 168u64)? * 60 * 60,
            ),
            external_url: get("APP_EXTERNAL_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            port: parse_or("PORT", get("PORT"), 8080u16)?,
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                get("HTTP_TIMEOUT_SECS"),
                10u64,
            )?),
            user_store,
            gcp_project_id: get("GCP_PROJECT_ID").unwrap_or_else(|| "local-dev".to_string()),
        })
    }

    /// True when identity tokens are verified with an RSA public key.
    pub fn uses_rsa_identity_key(&self) -> bool {
        self.casdoor_jwt_key.contains("-----BEGIN")
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("cannot parse {v:?}"),
        }),
    }
}

/// Turn a configured key value into key material.
///
/// Values that look like paths are read from disk (falling back to the raw
/// value if the file is unreadable); inline values have literal `\n`
/// sequences expanded so PEM keys survive single-line env vars.
fn load_key_material(raw: &str) -> String {
    let looks_like_path = raw.starts_with('/') || raw.starts_with("./") || raw.ends_with(".pem");
    if !looks_like_path {
        return raw.replace("\\n", "\n");
    }

    match std::fs::read_to_string(raw) {
        Ok(content) => {
            tracing::info!(path = raw, "Loaded JWT key from file");
            content.trim().to_string()
        }
        Err(e) => {
            tracing::warn!(path = raw, error = %e, "Failed to read JWT key file, using raw value");
            raw.to_string()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("CASDOOR_CLIENT_ID", "client"),
        ("CASDOOR_CLIENT_SECRET", " secret \n"),
        ("CASDOOR_JWT_SECRET", "shared-hs256-secret"),
        ("SESSION_SIGNING_KEY", "session_key_that_is_32_bytes_long!"),
    ];

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(REQUIRED)).expect("Config should load");

        assert_eq!(config.casdoor_endpoint, "http://localhost:8000");
        assert_eq!(config.casdoor_external_endpoint, "http://localhost:8000");
        assert_eq!(config.casdoor_client_secret, "secret");
        assert_eq!(config.casdoor_organization, "hello");
        assert_eq!(config.casdoor_application, "context-ID-DEV");
        assert_eq!(config.port, 8080);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.session_ttl, Duration::from_secs(168 * 3600));
        assert_eq!(config.user_store, UserStoreKind::Firestore);
        assert!(!config.uses_rsa_identity_key());
    }

    #[test]
    fn test_external_endpoint_precedence() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("CASDOOR_ENDPOINT", "http://casdoor:8000/"));
        pairs.push(("CASDOOR_EXTERNAL_ENDPOINT", "https://login.example.com"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.casdoor_endpoint, "http://casdoor:8000");
        assert_eq!(config.casdoor_external_endpoint, "https://login.example.com");

        pairs.push(("APP_CASDOOR_EXTERNAL_URL", "https://sso.example.com/"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.casdoor_external_endpoint, "https://sso.example.com");
    }

    #[test]
    fn test_missing_client_id() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "CASDOOR_CLIENT_ID")
            .collect();
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CASDOOR_CLIENT_ID")));
    }

    #[test]
    fn test_short_session_key_rejected() {
        let mut pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SESSION_SIGNING_KEY")
            .collect();
        pairs.push(("SESSION_SIGNING_KEY", "short"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "SESSION_SIGNING_KEY",
                ..
            }
        ));
    }

    #[test]
    fn test_inline_pem_newlines_expanded() {
        let mut pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "CASDOOR_JWT_SECRET")
            .collect();
        pairs.push((
            "CASDOOR_JWT_SECRET",
            "-----BEGIN PUBLIC KEY-----\\nAAAA\\n-----END PUBLIC KEY-----",
        ));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.uses_rsa_identity_key());
        assert_eq!(config.casdoor_jwt_key.lines().count(), 3);
    }

    #[test]
    fn test_invalid_port_and_store() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Invalid { key: "PORT", .. }
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("USER_STORE", "postgres"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Invalid {
                key: "USER_STORE",
                ..
            }
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("USER_STORE", "memory"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.user_store, UserStoreKind::Memory);
    }
}
