//! Store trait seams
//!
//! The pipeline workers and the credential validator hold the stores as
//! `Arc<dyn …>` so tests can substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use fleet_domain::{AlertSeverity, AlertType, TelemetryMessage};

use crate::error::Result;

/// Long-term time-series persistence
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Bulk-insert a batch of readings. Fails as a whole on any row error.
    async fn insert_batch(&self, msgs: &[Arc<TelemetryMessage>]) -> Result<()>;

    /// Insert one alert record; conflicts are silently ignored.
    async fn insert_alert(
        &self,
        vehicle_id: &str,
        fleet_id: &str,
        alert_type: AlertType,
        severity: AlertSeverity,
        trigger_value: f64,
    ) -> Result<()>;
}

/// Live state store backing the dashboard, auth lookups, and pub/sub
#[async_trait]
pub trait LiveStore: Send + Sync {
    /// Resolve an API key to its identity. A missing key is `Ok(None)`.
    async fn lookup_api_key(&self, api_key: &str) -> Result<Option<String>>;

    /// Apply one reading to the live view: state hash with expiry,
    /// geospatial index, and a published snapshot, as a single grouped call.
    async fn state_update(&self, msg: &TelemetryMessage) -> Result<()>;

    /// Whether an alert dedup mark exists for (vehicle, type).
    async fn check_alert_dedup(&self, vehicle_id: &str, alert_type: AlertType) -> Result<bool>;

    /// Set the alert dedup mark for (vehicle, type) with the fixed TTL.
    async fn set_alert_dedup(&self, vehicle_id: &str, alert_type: AlertType) -> Result<()>;

    /// Publish an alert notification on the fleet's alert channel.
    async fn publish_alert(&self, fleet_id: &str, payload: &str) -> Result<()>;
}
