// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: a fake Casdoor token endpoint and app builders.

use axum::{extract::State, http::StatusCode, routing::post, Form, Json, Router};
use context_id_gateway::config::Config;
use context_id_gateway::db::{FirestoreDb, UserRepository};
use context_id_gateway::routes::create_router;
use context_id_gateway::services::{AuthGateway, CasdoorClient, SessionIssuer, StateStore};
use context_id_gateway::AppState;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Code the fake provider always answers with a token signed by the wrong key.
#[allow(dead_code)]
pub const FORGED_CODE: &str = "forged:1";

/// Code the fake provider answers with HTTP 200 plus an `error` field.
#[allow(dead_code)]
pub const SOFT_ERROR_CODE: &str = "soft-error";

#[derive(Default)]
struct ProviderState {
    used_codes: Mutex<HashSet<String>>,
    exchanges: AtomicUsize,
}

/// Fake Casdoor token endpoint listening on localhost.
///
/// Codes look like `<username>:<anything>`; each is accepted once and
/// answered with an identity token for `<username>`.
#[allow(dead_code)]
pub struct FakeProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
}

#[allow(dead_code)]
impl FakeProvider {
    /// Number of token requests received so far.
    pub fn exchanges(&self) -> usize {
        self.state.exchanges.load(Ordering::SeqCst)
    }
}

#[derive(Deserialize)]
struct TokenForm {
    grant_type: String,
    client_id: String,
    client_secret: String,
    code: String,
}

/// Mint an identity token the way Casdoor does (user fields flattened).
#[allow(dead_code)]
pub fn provider_token(config: &Config, username: &str, key: &str, ttl_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    let claims = json!({
        "sub": format!("uuid-{username}"),
        "owner": config.casdoor_organization,
        "name": username,
        "displayName": format!("{username} display"),
        "email": format!("{username}@example.com"),
        "phone": "555-0100",
        "avatar": format!("https://cdn.example.com/{username}.png"),
        "iss": config.casdoor_endpoint,
        "aud": [config.casdoor_client_id],
        "exp": exp,
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .expect("Failed to sign provider token")
}

async fn token_endpoint(
    State((config, state)): State<(Config, Arc<ProviderState>)>,
    Form(form): Form<TokenForm>,
) -> (StatusCode, Json<Value>) {
    state.exchanges.fetch_add(1, Ordering::SeqCst);

    if form.grant_type != "authorization_code"
        || form.client_id != config.casdoor_client_id
        || form.client_secret != config.casdoor_client_secret
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        );
    }

    if form.code == SOFT_ERROR_CODE {
        return (
            StatusCode::OK,
            Json(json!({ "error": "invalid_grant", "error_description": "code is invalid" })),
        );
    }

    let Some((username, _)) = form.code.split_once(':') else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "unknown code" })),
        );
    };

    if !state.used_codes.lock().unwrap().insert(form.code.clone()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "code already used" })),
        );
    }

    let key = if form.code == FORGED_CODE {
        "not_the_configured_provider_key!!"
    } else {
        config.casdoor_jwt_key.as_str()
    };

    (
        StatusCode::OK,
        Json(json!({
            "access_token": provider_token(&config, username, key, 3600),
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "read",
        })),
    )
}

/// Start the fake provider for `config` (endpoint fields are ignored).
#[allow(dead_code)]
pub async fn spawn_fake_provider(config: &Config) -> FakeProvider {
    let state = Arc::new(ProviderState::default());

    let app = Router::new()
        .route("/api/login/oauth/access_token", post(token_endpoint))
        .with_state((config.clone(), state.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake provider");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeProvider {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Start a token endpoint that promises a body and hangs up halfway.
/// Returns its base URL.
#[allow(dead_code)]
pub async fn spawn_truncating_provider() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind truncating provider");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Read the request head and form body before answering
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(5).any(|w| w == b"code=") {
                    break;
                }
            }

            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 512\r\n\r\n{\"access_token\": \"eyJ",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

/// Test config pointing at a fake provider.
#[allow(dead_code)]
pub async fn config_with_provider() -> (Config, FakeProvider) {
    let mut config = Config::test_default();
    let provider = spawn_fake_provider(&config).await;
    config.casdoor_endpoint = provider.base_url.clone();
    config.casdoor_external_endpoint = "https://sso.example.com".to_string();
    (config, provider)
}

/// Build a gateway over `users`.
#[allow(dead_code)]
pub fn build_gateway(config: &Config, users: UserRepository) -> AuthGateway {
    let states = Arc::new(StateStore::new());
    let casdoor =
        CasdoorClient::new(config, Arc::clone(&states)).expect("Failed to build Casdoor client");
    let sessions = SessionIssuer::new(&config.session_signing_key, config.session_ttl);
    AuthGateway::new(states, casdoor, users, sessions)
}

/// Create a test app with an in-memory store and a fake provider.
/// Returns the router, the shared state and the provider.
#[allow(dead_code)]
pub async fn create_test_app() -> (Router, Arc<AppState>, FakeProvider) {
    let (config, provider) = config_with_provider().await;
    let gateway = build_gateway(&config, UserRepository::memory());

    let state = Arc::new(AppState { config, gateway });

    (create_router(state.clone()), state, provider)
}
