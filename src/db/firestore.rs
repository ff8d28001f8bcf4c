// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed user storage.
//!
//! Users live in the `users` collection with the URL-encoded username as
//! document ID, so the database itself guarantees one document per
//! username. Inserts use create-only semantics and report a conflict
//! instead of overwriting.

use crate::db::{collections, InsertOutcome, NewUser};
use crate::error::AppError;
use crate::models::LocalUser;
use firestore::errors::FirestoreError;
use ring::rand::{SecureRandom, SystemRandom};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Persistence("Database not connected (offline mode)".to_string())
        })
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by username (document ID).
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<LocalUser>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_doc_id(username))
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Get a user by numeric ID.
    pub async fn get_user_by_id(&self, id: u64) -> Result<Option<LocalUser>, AppError> {
        let users: Vec<LocalUser> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field("id").eq(id)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a user document; fails with `UsernameTaken` if it exists.
    pub async fn insert_user(&self, user: NewUser) -> Result<InsertOutcome, AppError> {
        let client = self.get_client()?;
        let user = user.into_user(random_user_id()?);

        let result: Result<(), FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(user_doc_id(&user.username))
            .object(&user)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(InsertOutcome::Created(user)),
            Err(FirestoreError::DataConflictError(_)) => {
                tracing::debug!(username = %user.username, "User document already exists");
                Ok(InsertOutcome::UsernameTaken)
            }
            Err(e) => Err(AppError::Persistence(e.to_string())),
        }
    }

    /// Overwrite a user document.
    pub async fn update_user(&self, user: &LocalUser) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_doc_id(&user.username))
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(())
    }
}

/// Document ID for a username (`/` is not allowed in Firestore IDs).
fn user_doc_id(username: &str) -> String {
    urlencoding::encode(username).into_owned()
}

/// Random positive ID that fits in a JSON number without precision loss.
fn random_user_id() -> Result<u64, AppError> {
    let mut bytes = [0u8; 8];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("failed to generate user id")))?;
    Ok((u64::from_le_bytes(bytes) >> 11).max(1))
}
