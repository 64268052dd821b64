//! Persistence interface shared by the HTTP handlers.
//!
//! Handlers only ever see `Arc<dyn ReadingStore>`; the Postgres
//! implementation is wired in `main`, tests swap in [`InMemoryReadingStore`].

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::db::models::{NewSensorReading, SensorReading};

pub use memory::InMemoryReadingStore;
pub use postgres::PgReadingStore;

/// Number of readings returned by the retrieval endpoint.
pub const RECENT_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist one reading. The store assigns `id` and `received_at` and
    /// returns the row as stored.
    async fn create_reading(&self, reading: NewSensorReading) -> Result<SensorReading, StoreError>;

    /// Return at most `limit` readings, newest `received_at` first.
    async fn find_recent(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError>;

    /// Cheap liveness probe used by `/health`.
    async fn is_connected(&self) -> bool;
}
