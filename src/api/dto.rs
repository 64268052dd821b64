use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::SensorReading;

/// Request body for `POST /api/sensor`.
///
/// Documentation only: the handler validates the raw JSON itself so that
/// missing fields can be listed by name.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingPayload {
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
    /// Capture time on the device clock (epoch milliseconds).
    pub timestamp: Option<i64>,
}

/// Response for a stored reading.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingCreatedDto {
    pub success: bool,
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    /// Threshold alerts, vibration first. Empty when all values are nominal.
    pub alerts: Vec<String>,
}

/// A stored reading as exposed by `GET /api/sensor`. Never carries `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadingDto {
    pub device_id: String,
    pub vibration: f64,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,
    pub timestamp: Option<i64>,
    pub received_at: DateTime<Utc>,
}

impl From<SensorReading> for SensorReadingDto {
    fn from(r: SensorReading) -> Self {
        Self {
            device_id: r.device_id,
            vibration: r.vibration,
            temperature: r.temperature,
            humidity: r.humidity,
            acc_x: r.acc_x,
            acc_y: r.acc_y,
            acc_z: r.acc_z,
            timestamp: r.timestamp,
            received_at: r.received_at,
        }
    }
}

/// Response for `GET /api/sensor`. Results are ordered by `receivedAt DESC`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecentReadingsDto {
    pub count: usize,
    pub results: Vec<SensorReadingDto>,
}

impl From<Vec<SensorReading>> for RecentReadingsDto {
    fn from(rows: Vec<SensorReading>) -> Self {
        let results: Vec<SensorReadingDto> = rows.into_iter().map(Into::into).collect();
        Self {
            count: results.len(),
            results,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
    /// `"connected"` or `"disconnected"`.
    pub database: String,
    /// Seconds since the process started.
    pub uptime: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndpointDto {
    pub method: String,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceDescriptorDto {
    pub name: String,
    pub version: String,
    pub endpoints: Vec<EndpointDto>,
}
