use async_trait::async_trait;
use sqlx::PgPool;

use super::{ReadingStore, StoreError};
use crate::db::models::{NewSensorReading, SensorReading};

/// `ReadingStore` backed by the `sensor_data` Postgres table.
///
/// `id` and `received_at` come from column defaults and are read back with
/// `RETURNING`, so the caller always sees what the database committed.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection. Pending acquires fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn create_reading(&self, reading: NewSensorReading) -> Result<SensorReading, StoreError> {
        let row = sqlx::query_as::<_, SensorReading>(
            r#"
            INSERT INTO sensor_data
                (device_id, vibration, temperature, humidity, acc_x, acc_y, acc_z, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, device_id, vibration, temperature, humidity,
                      acc_x, acc_y, acc_z, "timestamp", received_at
            "#,
        )
        .bind(&reading.device_id)
        .bind(reading.vibration)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.acc_x)
        .bind(reading.acc_y)
        .bind(reading.acc_z)
        .bind(reading.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<SensorReading>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, device_id, vibration, temperature, humidity,
                   acc_x, acc_y, acc_z, "timestamp", received_at
            FROM sensor_data
            ORDER BY received_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
