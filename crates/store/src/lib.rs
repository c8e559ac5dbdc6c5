//! Store adapters
//!
//! Two external stores back the ingestion core:
//!
//! - [`TimescaleStore`]: the long-term time-series store (TimescaleDB).
//!   Bulk-copy inserts for telemetry, single-row conflict-ignoring inserts
//!   for alerts.
//! - [`RedisStore`]: the live store. Per-vehicle state hashes with expiry,
//!   per-fleet geospatial index, pub/sub channels, API-key lookup, and
//!   alert dedup marks.
//!
//! The pipeline and the credential validator consume the stores through the
//! [`TelemetryStore`] and [`LiveStore`] traits so they can be exercised
//! against in-memory fakes.

mod error;
mod redis_store;
mod timescale;
mod traits;

pub use error::{Result, StoreError};
pub use redis_store::{RedisConfig, RedisStore, DEDUP_TTL_SECS, STATE_TTL_SECS};
pub use timescale::{TimescaleConfig, TimescaleStore};
pub use traits::{LiveStore, TelemetryStore};
