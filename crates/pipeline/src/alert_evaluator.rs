//! Alert evaluation
//!
//! Runs every reading on the alert path through the rule set. A firing rule
//! is deduplicated against the live store's per-(vehicle, type) mark, then
//! persisted (conflicts ignored), marked, and published to the fleet's
//! alert channel.
//!
//! The check-then-set around the dedup mark is not atomic: two workers can
//! both observe no mark and emit. The insert happens before the mark is
//! set, so the duplicate is bounded by the dedup window and the worker
//! count, which the mark semantics tolerate.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use fleet_domain::{AlertRule, TelemetryMessage, DEFAULT_RULES};
use fleet_store::{LiveStore, TelemetryStore};

use crate::MessageRx;

/// Rule-evaluating worker on the alert path
pub struct AlertEvaluator {
    id: usize,
    rx: MessageRx,
    store: Arc<dyn TelemetryStore>,
    live: Arc<dyn LiveStore>,
    rules: &'static [AlertRule],
}

impl AlertEvaluator {
    pub fn new(
        id: usize,
        rx: MessageRx,
        store: Arc<dyn TelemetryStore>,
        live: Arc<dyn LiveStore>,
    ) -> Self {
        Self {
            id,
            rx,
            store,
            live,
            rules: DEFAULT_RULES,
        }
    }

    /// Run until cancelled or the queue closes. Nothing is buffered, so
    /// shutdown needs no final flush.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::debug!(worker = self.id, rules = self.rules.len(), "alert evaluator starting");

        loop {
            tokio::select! {
                res = self.rx.recv() => match res {
                    Ok(msg) => self.evaluate(&msg).await,
                    Err(_) => break,
                },
                _ = cancel.cancelled() => break,
            }
        }

        tracing::debug!(worker = self.id, "alert evaluator stopped");
    }

    /// Evaluate every rule independently; one rule's failure never blocks
    /// another's emission.
    async fn evaluate(&self, msg: &TelemetryMessage) {
        for rule in self.rules {
            if !rule.matches(msg) {
                continue;
            }

            let is_duplicate = match self
                .live
                .check_alert_dedup(&msg.vehicle_id, rule.alert_type)
                .await
            {
                Ok(dup) => dup,
                Err(e) => {
                    // Fail quiet: suppress this rule for this reading
                    tracing::warn!(
                        worker = self.id,
                        vehicle_id = %msg.vehicle_id,
                        alert_type = %rule.alert_type,
                        error = %e,
                        "alert dedup check failed, skipping rule"
                    );
                    continue;
                }
            };
            if is_duplicate {
                continue;
            }

            let trigger_value = rule.alert_type.trigger_value(msg);

            if let Err(e) = self
                .store
                .insert_alert(
                    &msg.vehicle_id,
                    &msg.fleet_id,
                    rule.alert_type,
                    rule.severity,
                    trigger_value,
                )
                .await
            {
                tracing::warn!(
                    worker = self.id,
                    vehicle_id = %msg.vehicle_id,
                    alert_type = %rule.alert_type,
                    error = %e,
                    "alert insert failed"
                );
                continue;
            }

            // The record stands even if the mark cannot be set; a repeat
            // firing inside the window is then possible but rare.
            if let Err(e) = self
                .live
                .set_alert_dedup(&msg.vehicle_id, rule.alert_type)
                .await
            {
                tracing::warn!(
                    worker = self.id,
                    vehicle_id = %msg.vehicle_id,
                    alert_type = %rule.alert_type,
                    error = %e,
                    "alert dedup set failed"
                );
            }

            let payload = serde_json::json!({
                "vehicle_id": msg.vehicle_id,
                "fleet_id": msg.fleet_id,
                "alert_type": rule.alert_type.as_str(),
                "severity": rule.severity.as_str(),
                "value": trigger_value,
                "triggered_at": Utc::now().timestamp(),
            })
            .to_string();

            if let Err(e) = self.live.publish_alert(&msg.fleet_id, &payload).await {
                tracing::warn!(
                    worker = self.id,
                    fleet_id = %msg.fleet_id,
                    alert_type = %rule.alert_type,
                    error = %e,
                    "alert publish failed"
                );
            }
        }
    }
}
