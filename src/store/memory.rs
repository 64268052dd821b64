use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ReadingStore, StoreError};
use crate::db::models::{NewSensorReading, SensorReading};

/// Append-only in-memory store.
///
/// Wrapped in `Arc` so clones share the same rows. Readers never block each
/// other; a write holds the lock only for the push.
#[derive(Clone, Default)]
pub struct InMemoryReadingStore {
    rows: Arc<RwLock<Vec<SensorReading>>>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted readings.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn create_reading(&self, reading: NewSensorReading) -> Result<SensorReading, StoreError> {
        let mut rows = self.rows.write().await;
        // Stamped under the write lock so insertion order and received_at agree.
        let stored = SensorReading::from_new(reading, Uuid::new_v4(), Utc::now());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError> {
        let rows = self.rows.read().await;
        // Newest insert first, then a stable sort keeps that order for ties.
        let mut recent: Vec<SensorReading> = rows.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn is_connected(&self) -> bool {
        true
    }
}
