// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time OAuth state tokens for CSRF protection.
//!
//! Every login/signup URL carries a fresh random `state`. The callback must
//! present it back exactly once before its TTL runs out. All access to the
//! token map (including the background sweep) goes through one write lock,
//! so check-and-delete is atomic across concurrent callbacks.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How long a generated state stays valid.
pub const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// How often the sweeper drops expired-but-unused states.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Random bytes per state (256 bits).
const STATE_BYTES: usize = 32;

/// Reasons a state token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("invalid or already used state parameter")]
    Invalid,

    #[error("state parameter has expired")]
    Expired,
}

/// In-memory store of outstanding state tokens.
pub struct StateStore {
    states: RwLock<HashMap<String, Instant>>,
    ttl: Duration,
    rng: SystemRandom,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::with_ttl(STATE_TTL)
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose tokens live for `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            ttl,
            rng: SystemRandom::new(),
        }
    }

    /// Generate and record a new state token.
    pub async fn generate(&self) -> anyhow::Result<String> {
        let mut bytes = [0u8; STATE_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("failed to generate random state"))?;
        let state = URL_SAFE_NO_PAD.encode(bytes);

        let expires_at = Instant::now() + self.ttl;
        self.states.write().await.insert(state.clone(), expires_at);

        tracing::debug!(state = state_prefix(&state), "Generated state");
        Ok(state)
    }

    /// Validate and consume a state token.
    ///
    /// Succeeds at most once per token. An expired token is removed and
    /// reported as [`StateError::Expired`]; any later attempt then sees
    /// [`StateError::Invalid`].
    pub async fn validate(&self, state: &str) -> Result<(), StateError> {
        if state.is_empty() {
            return Err(StateError::Invalid);
        }

        let mut states = self.states.write().await;

        let Some(expires_at) = states.remove(state) else {
            tracing::warn!(state = state_prefix(state), "Invalid state parameter");
            return Err(StateError::Invalid);
        };

        if Instant::now() >= expires_at {
            tracing::warn!(state = state_prefix(state), "Expired state parameter");
            return Err(StateError::Expired);
        }

        tracing::debug!(state = state_prefix(state), "State validation successful");
        Ok(())
    }

    /// Remove every expired token. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let before = states.len();
        states.retain(|_, expires_at| now < *expires_at);
        before - states.len()
    }

    /// Number of outstanding (unconsumed) tokens, expired or not.
    pub async fn pending(&self) -> usize {
        self.states.read().await.len()
    }

    /// Start the periodic sweep on the current Tokio runtime.
    ///
    /// The task runs until [`SweeperHandle::shutdown`] is called or the
    /// handle is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let store = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let removed = store.purge_expired().await;
                        if removed > 0 {
                            tracing::debug!(removed, "Swept expired states");
                        }
                    }
                }
            }

            tracing::debug!("State sweeper stopped");
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owner of the background sweep task.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "State sweeper task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Loggable prefix of a state token.
pub fn state_prefix(state: &str) -> String {
    match state.get(..16) {
        Some(prefix) if prefix.len() < state.len() => format!("{prefix}..."),
        _ => state.to_string(),
    }
}
