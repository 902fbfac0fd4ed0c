use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};
use crate::models::InventoryEvent;

/// Process-local store. Used for tests and `DATABASE_URL=memory` demo runs;
/// contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<InventoryEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All records in insertion order.
    pub async fn snapshot(&self) -> Vec<InventoryEvent> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_one(&self, event: &InventoryEvent) -> Result<(), StoreError> {
        self.records.write().await.push(event.clone());
        Ok(())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<InventoryEvent>, StoreError> {
        let records = self.records.read().await;

        let mut indexed: Vec<(usize, &InventoryEvent)> = records.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));

        Ok(indexed
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }
}
