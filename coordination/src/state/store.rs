//! In-memory response registry
//!
//! Concurrent pipelines each write only their own key; the map itself sits
//! behind a `tokio::sync::RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::incident::ResponseRecord;

/// Shared reference to a response store
pub type SharedResponseStore = Arc<dyn ResponseStore>;

/// Registry of active and finished responses keyed by `responseId`
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn get(&self, response_id: &str) -> Option<ResponseRecord>;

    /// Insert or replace the snapshot for a response
    async fn set(&self, record: ResponseRecord);

    /// All snapshots, oldest first
    async fn values(&self) -> Vec<ResponseRecord>;
}

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, ResponseRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedResponseStore {
        Arc::new(self)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ResponseStore for InMemoryStore {
    async fn get(&self, response_id: &str) -> Option<ResponseRecord> {
        self.records.read().await.get(response_id).cloned()
    }

    async fn set(&self, record: ResponseRecord) {
        self.records
            .write()
            .await
            .insert(record.response_id().to_string(), record);
    }

    async fn values(&self) -> Vec<ResponseRecord> {
        let mut all: Vec<ResponseRecord> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.created_at());
        all
    }
}
