// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encrypted credential storage.
//!
//! Records are keyed by the SHA-256 hash of the raw Fitbit user id. All
//! three secret fields are encrypted with [`DataCipher`] and base64-encoded
//! before they reach the backend, and lookups never scan.

use super::{DocumentStore, ResponseCode, StoreError, StoreResult};
use crate::models::{CredentialRecord, DecodedCredential};
use crate::services::cipher::{hash_user_id, CipherError, DataCipher};
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;

/// Credential store over any [`DocumentStore`] backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn DocumentStore<CredentialRecord>>,
    cipher: DataCipher,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn DocumentStore<CredentialRecord>>, cipher: DataCipher) -> Self {
        Self { backend, cipher }
    }

    /// Build the storage form of a credential triple.
    pub fn prepare(&self, raw_user_id: &str, token: &str, refresh_token: &str) -> CredentialRecord {
        let now = format_utc_rfc3339(chrono::Utc::now());
        CredentialRecord {
            id: hash_user_id(raw_user_id),
            encrypted_user_id: self.cipher.encrypt_to_base64(raw_user_id),
            encrypted_access_token: self.cipher.encrypt_to_base64(token),
            encrypted_refresh_token: self.cipher.encrypt_to_base64(refresh_token),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Decrypt a stored record. Inverse of [`CredentialStore::prepare`].
    pub fn decode(&self, record: &CredentialRecord) -> Result<DecodedCredential, CipherError> {
        Ok(DecodedCredential {
            user_id: self.cipher.decrypt_from_base64(&record.encrypted_user_id)?,
            token: self.cipher.decrypt_from_base64(&record.encrypted_access_token)?,
            refresh_token: self
                .cipher
                .decrypt_from_base64(&record.encrypted_refresh_token)?,
        })
    }

    /// Store a new credential. Fails with `DuplicateKey` if the user exists.
    pub async fn insert(
        &self,
        raw_user_id: &str,
        token: &str,
        refresh_token: &str,
    ) -> StoreResult<()> {
        let record = self.prepare(raw_user_id, token, refresh_token);
        let result = self.backend.insert_one(&record.id, &record).await;
        log_outcome("insert", &record.id, &result);
        result
    }

    /// Read the credential for a raw user id.
    pub async fn read(&self, raw_user_id: &str) -> StoreResult<CredentialRecord> {
        self.read_by_hash(&hash_user_id(raw_user_id)).await
    }

    /// Read the credential by its hashed id.
    pub async fn read_by_hash(&self, hash_id: &str) -> StoreResult<CredentialRecord> {
        let result = self
            .backend
            .find_one(hash_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Credentials for user {}", hash_id)));
        if let Err(ref e) = result {
            tracing::debug!(user = %hash_id, error = %e, "Credential lookup failed");
        }
        result
    }

    /// Replace the token pair of an existing credential in one write.
    pub async fn update(
        &self,
        hash_id: &str,
        new_token: &str,
        new_refresh_token: &str,
    ) -> StoreResult<()> {
        let encrypted_access_token = self.cipher.encrypt_to_base64(new_token);
        let encrypted_refresh_token = self.cipher.encrypt_to_base64(new_refresh_token);
        let updated_at = format_utc_rfc3339(chrono::Utc::now());

        let result = match self
            .backend
            .update_one(
                hash_id,
                Box::new(move |record: &mut CredentialRecord| {
                    record.encrypted_access_token = encrypted_access_token;
                    record.encrypted_refresh_token = encrypted_refresh_token;
                    record.updated_at = updated_at;
                }),
            )
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::NotFound(format!(
                "Credentials for user {}",
                hash_id
            ))),
            Err(e) => Err(e),
        };
        log_outcome("update", hash_id, &result);
        result
    }

    /// Remove the credential for a raw user id.
    pub async fn delete(&self, raw_user_id: &str) -> StoreResult<()> {
        let hash_id = hash_user_id(raw_user_id);
        let result = match self.backend.delete_one(&hash_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::NotFound(format!(
                "Credentials for user {}",
                hash_id
            ))),
            Err(e) => Err(e),
        };
        log_outcome("delete", &hash_id, &result);
        result
    }

    /// All stored credentials. An empty collection is `NotFound`.
    pub async fn list_all(&self) -> StoreResult<Vec<CredentialRecord>> {
        let records = self.backend.find_all().await?;
        if records.is_empty() {
            return Err(StoreError::NotFound("No users found".to_string()));
        }
        Ok(records)
    }
}

fn log_outcome<T>(operation: &'static str, hash_id: &str, result: &StoreResult<T>) {
    match ResponseCode::of(result) {
        ResponseCode::Success => tracing::debug!(operation, user = %hash_id, "Credential store ok"),
        ResponseCode::Unknown => tracing::error!(
            operation,
            user = %hash_id,
            error = ?result.as_ref().err(),
            "Credential store failure"
        ),
        code => tracing::info!(operation, user = %hash_id, ?code, "Credential store rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCollection;

    fn store() -> CredentialStore {
        let cipher = DataCipher::new(&[3u8; 32]).unwrap();
        CredentialStore::new(Arc::new(MemoryCollection::new()), cipher)
    }

    #[test]
    fn test_prepare_decode_round_trip() {
        let store = store();
        let record = store.prepare("ABC123", "access", "refresh");

        assert_eq!(record.id, hash_user_id("ABC123"));
        assert!(!record.encrypted_user_id.contains("ABC123"));

        let decoded = store.decode(&record).unwrap();
        assert_eq!(decoded.user_id, "ABC123");
        assert_eq!(decoded.token, "access");
        assert_eq!(decoded.refresh_token, "refresh");
    }

    #[test]
    fn test_decode_corrupt_field() {
        let store = store();
        let mut record = store.prepare("ABC123", "access", "refresh");
        record.encrypted_access_token = "not base64!".to_string();

        assert!(matches!(
            store.decode(&record),
            Err(CipherError::Base64(_))
        ));
    }
}
