// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local user record for storage and API.

use serde::{Deserialize, Serialize};

/// Account status of a local user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

/// User mirrored from the identity provider.
///
/// `username` is the stable key across syncs; `id`, `created_at` and
/// `status` are never overwritten by a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: UserStatus,
    /// RFC3339, UTC
    pub created_at: String,
    /// RFC3339, UTC
    pub updated_at: String,
}

impl LocalUser {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}
