//! Ingestion pipeline
//!
//! Fan-out dispatch and the three consumer paths behind it.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──→ [DB queue]    ──→ DbWriter ×N    ──→ Timescale (bulk copy)
//! [HTTP] ─ Dispatcher ─┼──→ [State queue] ──→ StateWriter ×N ──→ Redis (state + geo + pub/sub)
//!                      └──→ [Alert queue] ──→ AlertEvaluator ×N → rules → dedup → insert → publish
//! ```
//!
//! # Key Design
//!
//! - **Arc fan-out**: one `Arc<TelemetryMessage>` reference per queue, no
//!   copies.
//! - **Load shedding**: the dispatcher uses non-blocking `try_send`; a full
//!   queue drops the message for that path only and counts the drop.
//!   Downstream stalls never propagate to the ingestion boundary.
//! - **MPMC queues**: each stage runs N workers pulling from one shared
//!   bounded channel; no partitioning by vehicle.
//! - **Cooperative shutdown**: every worker observes one
//!   `CancellationToken`, drains its current buffer once, and exits.
//!   Messages still queued at shutdown may be lost, a deliberate trade for
//!   bounded shutdown latency.

mod alert_evaluator;
mod db_writer;
mod dispatcher;
mod state_writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use alert_evaluator::AlertEvaluator;
pub use db_writer::DbWriter;
pub use dispatcher::{Dispatcher, PipelineChannels};
pub use state_writer::StateWriter;

use std::sync::Arc;

use fleet_domain::TelemetryMessage;

/// Consumer side of a pipeline queue; clone one per worker.
pub type MessageRx = crossfire::MAsyncRx<Arc<TelemetryMessage>>;
