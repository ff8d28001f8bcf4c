// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - authentication core.

pub mod casdoor;
pub mod gateway;
pub mod session;
pub mod state_store;
pub mod token_validator;
pub mod user_sync;

pub use casdoor::{AuthUrl, CasdoorClient};
pub use gateway::{AuthGateway, LoginOutcome};
pub use session::{SessionClaims, SessionIssuer};
pub use state_store::{StateError, StateStore, SweeperHandle};
pub use token_validator::TokenValidator;
pub use user_sync::sync_user;
