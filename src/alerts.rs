//! Threshold alerts derived from a single reading.
//!
//! Alerts are never stored; they are recomputed from the persisted values on
//! every ingest and returned to the device alongside the acknowledgement.

use crate::db::models::SensorReading;

/// Vibration above this many g raises an alert. Exclusive.
pub const VIBRATION_LIMIT_G: f64 = 2.0;

/// Temperature above this many °C raises an alert. Exclusive.
pub const TEMPERATURE_LIMIT_C: f64 = 60.0;

/// Separator used when alerts are joined into a single log line.
pub const LOG_SEPARATOR: &str = " | ";

/// Evaluate both thresholds. Vibration is checked first, so when both fire
/// the vibration message comes first.
pub fn derive_alerts(vibration: f64, temperature: f64) -> Vec<String> {
    let mut alerts = Vec::with_capacity(2);
    if vibration > VIBRATION_LIMIT_G {
        alerts.push(format!("High vibration: {vibration}g"));
    }
    if temperature > TEMPERATURE_LIMIT_C {
        alerts.push(format!("Critical temperature: {temperature}°C"));
    }
    alerts
}

/// Alerts for a reading as it was stored.
pub fn for_reading(reading: &SensorReading) -> Vec<String> {
    derive_alerts(reading.vibration, reading.temperature)
}
