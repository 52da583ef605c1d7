//! In-process document store, used by tests and dry runs.

use super::{DocumentStore, SportDocument};
use crate::models::Sport;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<FxHashMap<Sport, SportDocument>>,
    writes: RwLock<u32>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: SportDocument) -> Self {
        let store = Self::new();
        store.documents.write().insert(document.sport, document);
        store
    }

    /// Number of successful replace calls
    pub fn write_count(&self) -> u32 {
        *self.writes.read()
    }

    pub fn snapshot(&self, sport: Sport) -> Option<SportDocument> {
        self.documents.read().get(&sport).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, sport: Sport) -> Result<Option<SportDocument>> {
        Ok(self.snapshot(sport))
    }

    async fn replace(&self, sport: Sport, document: &SportDocument) -> Result<()> {
        self.documents.write().insert(sport, document.clone());
        *self.writes.write() += 1;
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
