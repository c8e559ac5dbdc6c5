//! Fleet telemetry domain types
//!
//! The core data model shared by every stage of the ingestion pipeline:
//! telemetry readings, the inbound submission payload, and the alert rule
//! set evaluated against each reading.
//!
//! A [`TelemetryMessage`] is created once at ingress and is read-only from
//! then on. Downstream consumers share it as `Arc<TelemetryMessage>`, so the
//! type carries no interior mutability.

mod alert;
mod telemetry;

pub use alert::{AlertRule, AlertSeverity, AlertType, DEFAULT_RULES};
pub use telemetry::{SubmissionError, TelemetryMessage, TelemetrySubmission};
