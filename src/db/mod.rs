// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Stores are written against the [`DocumentStore`] trait so the same
//! credential and vitals logic runs on Firestore in production and on the
//! in-memory backend in tests.

pub mod credentials;
pub mod firestore;
pub mod memory;
pub mod vitals;

pub use credentials::CredentialStore;
pub use firestore::{FirestoreCollection, FirestoreDb};
pub use memory::MemoryCollection;
pub use vitals::VitalsStore;

use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Encrypted OAuth credentials (keyed by hashed user id)
    pub const USERS: &str = "users";
    /// Daily vitals (keyed by `{user_hash}_{date}`)
    pub const VITALS: &str = "vitals";
}

/// Outcome code of a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    DuplicateKey,
    NotFound,
    Unknown,
}

impl ResponseCode {
    pub fn of<T>(result: &StoreResult<T>) -> Self {
        match result {
            Ok(_) => ResponseCode::Success,
            Err(e) => e.code(),
        }
    }
}

/// Store operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Document already exists: {0}")]
    DuplicateKey(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Unknown(String),
}

impl StoreError {
    pub fn code(&self) -> ResponseCode {
        match self {
            StoreError::DuplicateKey(_) => ResponseCode::DuplicateKey,
            StoreError::NotFound(_) => ResponseCode::NotFound,
            StoreError::Unknown(_) => ResponseCode::Unknown,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-place modification applied by [`DocumentStore::update_one`].
pub type DocumentUpdate<D> = Box<dyn FnOnce(&mut D) + Send>;

/// A collection of documents addressed by a string primary key.
#[async_trait]
pub trait DocumentStore<D: Send + Sync>: Send + Sync {
    /// Insert a new document. Fails with `DuplicateKey` if `id` exists.
    async fn insert_one(&self, id: &str, document: &D) -> StoreResult<()>;

    async fn find_one(&self, id: &str) -> StoreResult<Option<D>>;

    /// Apply `update` to the document and write it back in a single write.
    ///
    /// Returns `false` if no document matched.
    async fn update_one(&self, id: &str, update: DocumentUpdate<D>) -> StoreResult<bool>;

    /// Returns `false` if no document matched.
    async fn delete_one(&self, id: &str) -> StoreResult<bool>;

    async fn find_all(&self) -> StoreResult<Vec<D>>;
}
