//! Vitals storage (write-once per user and date).

use super::{DocumentStore, StoreResult};
use crate::models::VitalsRecord;
use std::sync::Arc;

/// Secondary store for aggregated vitals.
#[derive(Clone)]
pub struct VitalsStore {
    backend: Arc<dyn DocumentStore<VitalsRecord>>,
}

impl VitalsStore {
    pub fn new(backend: Arc<dyn DocumentStore<VitalsRecord>>) -> Self {
        Self { backend }
    }

    /// Insert a record. A second write for the same user and date fails
    /// with `DuplicateKey`.
    pub async fn insert(&self, record: &VitalsRecord) -> StoreResult<()> {
        let id = VitalsRecord::document_id(&record.user_id_hash, &record.date);
        self.backend.insert_one(&id, record).await
    }

    pub async fn read(&self, user_id_hash: &str, date: &str) -> StoreResult<Option<VitalsRecord>> {
        self.backend
            .find_one(&VitalsRecord::document_id(user_id_hash, date))
            .await
    }
}
