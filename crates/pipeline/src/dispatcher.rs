//! Fan-out dispatcher
//!
//! Places one reference to each accepted message onto three bounded queues.
//! Enqueue attempts never block: a full queue sheds the message for that
//! path and increments its drop counter. A drop on one path does not affect
//! the others.

use std::sync::Arc;

use crossfire::MAsyncTx;

use fleet_domain::TelemetryMessage;
use fleet_metrics::IngestionMetrics;

use crate::MessageRx;

type MessageTx = MAsyncTx<Arc<TelemetryMessage>>;

/// Consumer handles for the three pipeline queues
///
/// Each receiver is cloned once per worker; the queues are
/// many-producer/many-consumer.
pub struct PipelineChannels {
    pub db_rx: MessageRx,
    pub state_rx: MessageRx,
    pub alert_rx: MessageRx,
}

/// Non-blocking fan-out to the DB, state, and alert paths
pub struct Dispatcher {
    db_tx: MessageTx,
    state_tx: MessageTx,
    alert_tx: MessageTx,
    metrics: Arc<IngestionMetrics>,
}

impl Dispatcher {
    /// Create the three bounded queues and the dispatcher feeding them.
    ///
    /// Capacities are sized per path; the state path is typically the
    /// largest since it absorbs dashboard bursts.
    pub fn new(
        db_capacity: usize,
        state_capacity: usize,
        alert_capacity: usize,
        metrics: Arc<IngestionMetrics>,
    ) -> (Self, PipelineChannels) {
        let (db_tx, db_rx) = crossfire::mpmc::bounded_async(db_capacity);
        let (state_tx, state_rx) = crossfire::mpmc::bounded_async(state_capacity);
        let (alert_tx, alert_rx) = crossfire::mpmc::bounded_async(alert_capacity);

        (
            Self {
                db_tx,
                state_tx,
                alert_tx,
                metrics,
            },
            PipelineChannels {
                db_rx,
                state_rx,
                alert_rx,
            },
        )
    }

    /// Offer the message to all three paths. Never blocks the caller.
    pub fn dispatch(&self, msg: Arc<TelemetryMessage>) {
        if self.db_tx.try_send(Arc::clone(&msg)).is_err() {
            self.metrics.record_db_channel_drop();
            tracing::trace!(vehicle_id = %msg.vehicle_id, "db queue full, message shed");
        }

        if self.state_tx.try_send(Arc::clone(&msg)).is_err() {
            self.metrics.record_state_channel_drop();
            tracing::trace!(vehicle_id = %msg.vehicle_id, "state queue full, message shed");
        }

        if self.alert_tx.try_send(Arc::clone(&msg)).is_err() {
            self.metrics.record_alert_channel_drop();
            tracing::trace!(vehicle_id = %msg.vehicle_id, "alert queue full, message shed");
        }
    }
}
