//! Telemetry reading and inbound submission payload

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// One reading submitted by one vehicle at one instant.
///
/// Created at ingress, read-only thereafter. The three pipeline paths hold
/// the same message behind `Arc`, so nothing here is mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    /// Server receipt time, assigned at ingestion
    pub received_at: DateTime<Utc>,

    /// Device-reported reading time
    pub timestamp: DateTime<Utc>,
    pub vehicle_id: String,
    pub fleet_id: String,

    pub latitude: f64,
    pub longitude: f64,

    pub speed_kmh: f64,
    pub fuel_pct: f64,
    pub engine_temp_c: f64,
    pub battery_voltage: f64,
    pub odometer_km: f64,
    pub is_moving: bool,
    pub engine_on: bool,

    /// Original submission bytes, retained for replay/debugging
    pub raw_payload: Vec<u8>,
}

/// Validation failure for an inbound submission
#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Inbound JSON submission body
///
/// The wire shape accepted on the telemetry endpoint. `timestamp` is
/// RFC 3339. The struct is validated before conversion; the exact body
/// bytes are kept as the message's raw payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySubmission {
    pub vehicle_id: String,
    pub fleet_id: String,
    pub timestamp: DateTime<Utc>,

    pub latitude: f64,
    pub longitude: f64,

    pub speed_kmh: f64,
    pub fuel_pct: f64,
    pub engine_temp_c: f64,
    pub battery_voltage: f64,
    pub odometer_km: f64,

    #[serde(default)]
    pub is_moving: bool,
    #[serde(default)]
    pub engine_on: bool,
}

impl TelemetrySubmission {
    /// Check field bounds: non-empty identities, coordinates within range,
    /// speed non-negative, fuel within 0..=100.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.vehicle_id.is_empty() {
            return Err(SubmissionError::EmptyField {
                field: "vehicle_id",
            });
        }
        if self.fleet_id.is_empty() {
            return Err(SubmissionError::EmptyField { field: "fleet_id" });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SubmissionError::OutOfRange {
                field: "latitude",
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SubmissionError::OutOfRange {
                field: "longitude",
                value: self.longitude,
            });
        }
        if self.speed_kmh < 0.0 {
            return Err(SubmissionError::OutOfRange {
                field: "speed_kmh",
                value: self.speed_kmh,
            });
        }
        if !(0.0..=100.0).contains(&self.fuel_pct) {
            return Err(SubmissionError::OutOfRange {
                field: "fuel_pct",
                value: self.fuel_pct,
            });
        }
        Ok(())
    }

    /// Convert into a [`TelemetryMessage`], stamping the server receipt time
    /// and attaching the original submission bytes.
    pub fn into_message(self, received_at: DateTime<Utc>, raw_payload: Vec<u8>) -> TelemetryMessage {
        TelemetryMessage {
            received_at,
            timestamp: self.timestamp,
            vehicle_id: self.vehicle_id,
            fleet_id: self.fleet_id,
            latitude: self.latitude,
            longitude: self.longitude,
            speed_kmh: self.speed_kmh,
            fuel_pct: self.fuel_pct,
            engine_temp_c: self.engine_temp_c,
            battery_voltage: self.battery_voltage,
            odometer_km: self.odometer_km,
            is_moving: self.is_moving,
            engine_on: self.engine_on,
            raw_payload,
        }
    }
}
