// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory user store for tests and local development.

use crate::db::{InsertOutcome, NewUser};
use crate::error::AppError;
use crate::models::LocalUser;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Users keyed by username. The map entry lock is the uniqueness backstop.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, LocalUser>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_username(&self, username: &str) -> Option<LocalUser> {
        self.users.get(username).map(|u| u.clone())
    }

    pub fn get_by_id(&self, id: u64) -> Option<LocalUser> {
        self.users
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, user: NewUser) -> InsertOutcome {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => InsertOutcome::UsernameTaken,
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let user = user.into_user(id);
                slot.insert(user.clone());
                InsertOutcome::Created(user)
            }
        }
    }

    pub fn update(&self, user: &LocalUser) -> Result<(), AppError> {
        let mut stored = self.users.get_mut(&user.username).ok_or_else(|| {
            AppError::Persistence(format!("user {} does not exist", user.username))
        })?;

        if stored.id != user.id {
            return Err(AppError::Persistence(format!(
                "user {} id mismatch ({} != {})",
                user.username, stored.id, user.id
            )));
        }

        *stored = user.clone();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
