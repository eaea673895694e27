//! In-memory document store for tests and local runs.

use super::{DocumentStore, DocumentUpdate, StoreError, StoreResult};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

/// A collection held in a concurrent map. Clones share the same data.
pub struct MemoryCollection<D> {
    docs: Arc<DashMap<String, D>>,
}

impl<D> Clone for MemoryCollection<D> {
    fn clone(&self) -> Self {
        Self {
            docs: self.docs.clone(),
        }
    }
}

impl<D> Default for MemoryCollection<D> {
    fn default() -> Self {
        Self {
            docs: Arc::new(DashMap::new()),
        }
    }
}

impl<D> MemoryCollection<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl<D> DocumentStore<D> for MemoryCollection<D>
where
    D: Clone + Send + Sync + 'static,
{
    async fn insert_one(&self, id: &str, document: &D) -> StoreResult<()> {
        match self.docs.entry(id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(document.clone());
                Ok(())
            }
        }
    }

    async fn find_one(&self, id: &str) -> StoreResult<Option<D>> {
        Ok(self.docs.get(id).map(|doc| doc.value().clone()))
    }

    async fn update_one(&self, id: &str, update: DocumentUpdate<D>) -> StoreResult<bool> {
        match self.docs.get_mut(id) {
            Some(mut doc) => {
                update(doc.value_mut());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_one(&self, id: &str) -> StoreResult<bool> {
        Ok(self.docs.remove(id).is_some())
    }

    async fn find_all(&self) -> StoreResult<Vec<D>> {
        Ok(self.docs.iter().map(|doc| doc.value().clone()).collect())
    }
}
