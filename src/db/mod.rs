// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local user storage.
//!
//! Every backend enforces username uniqueness itself; callers never rely on
//! lookup-then-insert being atomic.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::{Config, UserStoreKind};
use crate::error::AppError;
use crate::models::LocalUser;

/// Collection names as constants.
pub mod collections {
    /// Users, keyed by (URL-encoded) username
    pub const USERS: &str = "users";
}

/// Result of a create-only insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(LocalUser),
    /// Another record already owns this username.
    UsernameTaken,
}

/// A not-yet-stored user; the backend assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: String,
    pub phone: String,
    pub created_at: String,
}

impl NewUser {
    pub(crate) fn into_user(self, id: u64) -> LocalUser {
        LocalUser {
            id,
            username: self.username,
            email: self.email,
            display_name: self.display_name,
            avatar: self.avatar,
            phone: self.phone,
            status: Default::default(),
            updated_at: self.created_at.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

/// User repository over the configured backend.
#[derive(Clone)]
pub struct UserRepository {
    backend: Backend,
}

impl UserRepository {
    /// Connect the backend selected in `config`.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.user_store {
            UserStoreKind::Firestore => {
                Ok(Self::firestore(FirestoreDb::new(&config.gcp_project_id).await?))
            }
            UserStoreKind::Memory => {
                tracing::warn!("Using in-memory user store; records are lost on restart");
                Ok(Self::memory())
            }
        }
    }

    pub fn firestore(db: FirestoreDb) -> Self {
        Self {
            backend: Backend::Firestore(db),
        }
    }

    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryDb::new()),
        }
    }

    /// Repository whose every operation fails (offline testing).
    pub fn offline() -> Self {
        Self::firestore(FirestoreDb::new_mock())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<LocalUser>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_by_username(username).await,
            Backend::Memory(db) => Ok(db.get_by_username(username)),
        }
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Option<LocalUser>, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.get_user_by_id(id).await,
            Backend::Memory(db) => Ok(db.get_by_id(id)),
        }
    }

    /// Create-only insert; never overwrites an existing username.
    pub async fn insert(&self, user: NewUser) -> Result<InsertOutcome, AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.insert_user(user).await,
            Backend::Memory(db) => Ok(db.insert(user)),
        }
    }

    /// Replace the stored record for `user.username`.
    pub async fn update(&self, user: &LocalUser) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(db) => db.update_user(user).await,
            Backend::Memory(db) => db.update(user),
        }
    }
}
