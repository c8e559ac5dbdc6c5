//! Shared fakes for pipeline worker tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use fleet_domain::{AlertSeverity, AlertType, TelemetryMessage};
use fleet_store::{LiveStore, Result as StoreResult, StoreError, TelemetryStore};

/// A plausible reading; callers override fields as needed.
pub(crate) fn message(vehicle_id: &str) -> TelemetryMessage {
    TelemetryMessage {
        received_at: Utc::now(),
        timestamp: Utc::now(),
        vehicle_id: vehicle_id.to_string(),
        fleet_id: "fleet-a".into(),
        latitude: 48.2,
        longitude: 16.4,
        speed_kmh: 60.0,
        fuel_pct: 50.0,
        engine_temp_c: 85.0,
        battery_voltage: 12.5,
        odometer_km: 10_000.0,
        is_moving: true,
        engine_on: true,
        raw_payload: br#"{"vehicle_id":"test"}"#.to_vec(),
    }
}

/// Time-series store fake recording batch sizes and alert rows
#[derive(Default)]
pub(crate) struct MockTelemetryStore {
    /// Size of each insert_batch call, in order
    pub batches: Mutex<Vec<usize>>,
    /// (vehicle, fleet, type, severity, value) per insert_alert call
    pub alerts: Mutex<Vec<(String, String, AlertType, AlertSeverity, f64)>>,
    /// Fail this many insert_batch calls before succeeding
    pub fail_next_inserts: AtomicUsize,
    /// Fail every insert_alert call
    pub fail_alert_inserts: bool,
}

impl MockTelemetryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_inserts(times: usize) -> Arc<Self> {
        let store = Self::default();
        store.fail_next_inserts.store(times, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl TelemetryStore for MockTelemetryStore {
    async fn insert_batch(&self, msgs: &[Arc<TelemetryMessage>]) -> StoreResult<()> {
        self.batches.lock().unwrap().push(msgs.len());
        let remaining = self.fail_next_inserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_inserts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Connect("fake insert failure".into()));
        }
        Ok(())
    }

    async fn insert_alert(
        &self,
        vehicle_id: &str,
        fleet_id: &str,
        alert_type: AlertType,
        severity: AlertSeverity,
        trigger_value: f64,
    ) -> StoreResult<()> {
        if self.fail_alert_inserts {
            return Err(StoreError::Connect("fake alert insert failure".into()));
        }
        self.alerts.lock().unwrap().push((
            vehicle_id.to_string(),
            fleet_id.to_string(),
            alert_type,
            severity,
            trigger_value,
        ));
        Ok(())
    }
}

/// Live store fake with an in-memory dedup set and publish log
#[derive(Default)]
pub(crate) struct MockLiveStore {
    /// Vehicle ids passed to state_update, in order
    pub state_updates: Mutex<Vec<String>>,
    /// state_update fails for this vehicle id
    pub fail_state_for: Option<String>,
    /// (vehicle, type) pairs currently marked
    pub dedup: Mutex<HashSet<(String, AlertType)>>,
    pub dedup_check_errors: bool,
    pub dedup_set_errors: bool,
    /// (fleet, payload) per publish_alert call
    pub publishes: Mutex<Vec<(String, String)>>,
}

impl MockLiveStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updated_vehicles(&self) -> Vec<String> {
        self.state_updates.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.lock().unwrap().len()
    }

    pub fn is_marked(&self, vehicle_id: &str, alert_type: AlertType) -> bool {
        self.dedup
            .lock()
            .unwrap()
            .contains(&(vehicle_id.to_string(), alert_type))
    }
}

#[async_trait]
impl LiveStore for MockLiveStore {
    async fn lookup_api_key(&self, _api_key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    async fn state_update(&self, msg: &TelemetryMessage) -> StoreResult<()> {
        if self.fail_state_for.as_deref() == Some(msg.vehicle_id.as_str()) {
            return Err(StoreError::Connect("fake state update failure".into()));
        }
        self.state_updates
            .lock()
            .unwrap()
            .push(msg.vehicle_id.clone());
        Ok(())
    }

    async fn check_alert_dedup(
        &self,
        vehicle_id: &str,
        alert_type: AlertType,
    ) -> StoreResult<bool> {
        if self.dedup_check_errors {
            return Err(StoreError::Connect("fake dedup check failure".into()));
        }
        Ok(self.is_marked(vehicle_id, alert_type))
    }

    async fn set_alert_dedup(&self, vehicle_id: &str, alert_type: AlertType) -> StoreResult<()> {
        if self.dedup_set_errors {
            return Err(StoreError::Connect("fake dedup set failure".into()));
        }
        self.dedup
            .lock()
            .unwrap()
            .insert((vehicle_id.to_string(), alert_type));
        Ok(())
    }

    async fn publish_alert(&self, fleet_id: &str, payload: &str) -> StoreResult<()> {
        self.publishes
            .lock()
            .unwrap()
            .push((fleet_id.to_string(), payload.to_string()));
        Ok(())
    }
}
