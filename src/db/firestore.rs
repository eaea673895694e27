// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`DocumentStore`].
//!
//! Provides typed collection handles for:
//! - Users (encrypted OAuth credentials)
//! - Vitals (daily aggregated Fitbit data)

use super::{DocumentStore, DocumentUpdate, StoreError, StoreResult};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde::{de::DeserializeOwned, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Unknown(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
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
            StoreError::Unknown(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Typed handle on a named collection.
    pub fn collection(&self, name: &str) -> FirestoreCollection {
        FirestoreCollection {
            db: self.clone(),
            name: name.to_string(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> StoreResult<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Unknown("Database not connected (offline mode)".to_string()))
    }
}

/// One Firestore collection.
#[derive(Clone)]
pub struct FirestoreCollection {
    db: FirestoreDb,
    name: String,
}

fn backend_error(e: FirestoreError) -> StoreError {
    StoreError::Unknown(e.to_string())
}

#[async_trait]
impl<D> DocumentStore<D> for FirestoreCollection
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn insert_one(&self, id: &str, document: &D) -> StoreResult<()> {
        let result: Result<(), FirestoreError> = self
            .db
            .get_client()?
            .fluent()
            .insert()
            .into(&self.name)
            .document_id(id)
            .object(document)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            // Firestore reports ALREADY_EXISTS as a data conflict
            Err(FirestoreError::DataConflictError(_)) => {
                Err(StoreError::DuplicateKey(id.to_string()))
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn find_one(&self, id: &str) -> StoreResult<Option<D>> {
        self.db
            .get_client()?
            .fluent()
            .select()
            .by_id_in(&self.name)
            .obj()
            .one(id)
            .await
            .map_err(backend_error)
    }

    async fn update_one(&self, id: &str, update: DocumentUpdate<D>) -> StoreResult<bool> {
        let client = self.db.get_client()?;

        let current: Option<D> = client
            .fluent()
            .select()
            .by_id_in(&self.name)
            .obj()
            .one(id)
            .await
            .map_err(backend_error)?;

        let Some(mut document) = current else {
            return Ok(false);
        };
        update(&mut document);

        // The whole document goes out in one write
        let _: () = client
            .fluent()
            .update()
            .in_col(&self.name)
            .document_id(id)
            .object(&document)
            .execute()
            .await
            .map_err(backend_error)?;

        Ok(true)
    }

    async fn delete_one(&self, id: &str) -> StoreResult<bool> {
        let client = self.db.get_client()?;

        let existing: Option<D> = client
            .fluent()
            .select()
            .by_id_in(&self.name)
            .obj()
            .one(id)
            .await
            .map_err(backend_error)?;

        if existing.is_none() {
            return Ok(false);
        }

        client
            .fluent()
            .delete()
            .from(&self.name)
            .document_id(id)
            .execute()
            .await
            .map_err(backend_error)?;

        Ok(true)
    }

    async fn find_all(&self) -> StoreResult<Vec<D>> {
        self.db
            .get_client()?
            .fluent()
            .select()
            .from(self.name.as_str())
            .obj()
            .query()
            .await
            .map_err(backend_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CredentialRecord;

    #[tokio::test]
    async fn test_offline_collection_fails_every_call() {
        let collection = FirestoreDb::new_mock().collection("users");

        let result: StoreResult<Option<CredentialRecord>> = collection.find_one("abc").await;
        assert!(matches!(result, Err(StoreError::Unknown(_))));

        let result: StoreResult<Vec<CredentialRecord>> = collection.find_all().await;
        assert!(matches!(result, Err(StoreError::Unknown(_))));
    }
}
