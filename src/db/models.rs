use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A validated reading that has not been persisted yet.
///
/// Only `device_id`, `vibration` and `temperature` are mandatory; the
/// remaining measurements are stored as `NULL` when the device omits them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorReading {
    pub device_id: String,
    /// g-force magnitude.
    pub vibration: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: Option<f64>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,
    /// Capture time on the device clock (usually epoch milliseconds).
    pub timestamp: Option<i64>,
}

/// Mirrors a row of the `sensor_data` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub device_id: String,
    pub vibration: f64,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,
    pub timestamp: Option<i64>,
    /// Assigned by the store when the row is inserted. Never updated.
    pub received_at: DateTime<Utc>,
}

impl SensorReading {
    /// Build the stored form of `new` with the server-assigned columns.
    pub fn from_new(new: NewSensorReading, id: Uuid, received_at: DateTime<Utc>) -> Self {
        Self {
            id,
            device_id: new.device_id,
            vibration: new.vibration,
            temperature: new.temperature,
            humidity: new.humidity,
            acc_x: new.acc_x,
            acc_y: new.acc_y,
            acc_z: new.acc_z,
            timestamp: new.timestamp,
            received_at,
        }
    }
}
