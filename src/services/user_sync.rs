// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reconcile a provider identity with the local user record.

use crate::db::{InsertOutcome, NewUser, UserRepository};
use crate::error::AppError;
use crate::models::{IdentityClaims, LocalUser};
use crate::time_utils::now_rfc3339;

/// Create or update the local user for `identity`.
///
/// Repeated calls with the same identity converge on one record whose
/// profile fields match the latest call; `id`, `created_at` and `status`
/// stay as first written. When two callbacks race on a new username the
/// loser's insert is refused by the store and it falls back to an update.
pub async fn sync_user(
    repo: &UserRepository,
    identity: &IdentityClaims,
) -> Result<LocalUser, AppError> {
    let now = now_rfc3339();

    let existing = match repo.get_by_username(&identity.name).await? {
        Some(existing) => existing,
        None => {
            let new_user = NewUser {
                username: identity.name.clone(),
                email: identity.email.clone(),
                display_name: identity.display_name.clone(),
                avatar: identity.avatar.clone(),
                phone: identity.phone.clone(),
                created_at: now.clone(),
            };

            match repo.insert(new_user).await? {
                InsertOutcome::Created(user) => {
                    tracing::info!(user_id = user.id, username = %user.username, "Created local user");
                    return Ok(user);
                }
                InsertOutcome::UsernameTaken => {
                    tracing::debug!(username = %identity.name, "Lost insert race, updating instead");
                    repo.get_by_username(&identity.name).await?.ok_or_else(|| {
                        AppError::Persistence(format!(
                            "user {} reported as existing but not found",
                            identity.name
                        ))
                    })?
                }
            }
        }
    };

    let user = LocalUser {
        email: identity.email.clone(),
        display_name: identity.display_name.clone(),
        avatar: identity.avatar.clone(),
        phone: identity.phone.clone(),
        updated_at: now,
        ..existing
    };

    repo.update(&user).await?;
    tracing::info!(user_id = user.id, username = %user.username, "Updated local user");
    Ok(user)
}
