// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Context-ID Gateway: Casdoor OAuth login broker
//!
//! This crate brokers authorization-code logins against Casdoor, guards the
//! callback with one-time state tokens, mirrors the provider identity into a
//! local user record, and issues signed session tokens.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::AuthGateway;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub gateway: AuthGateway,
}
