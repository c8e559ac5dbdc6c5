//! Ingestion metrics
//!
//! Six process-global monotonic counters exposed over a plain-text endpoint.
//! All counters use relaxed ordering; values are eventually consistent, not
//! real-time. The instance is created once at startup and shared by `Arc`;
//! there are no statics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Content type for the text exposition format
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Monotonic counters for the ingestion pipeline
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Messages accepted at the HTTP boundary
    messages_received: AtomicU64,

    /// Messages persisted to the time-series store
    db_write_success: AtomicU64,

    /// Messages lost after the bulk-insert retry also failed
    db_write_failures: AtomicU64,

    /// Messages shed because the DB queue was full
    db_channel_drops: AtomicU64,

    /// Messages shed because the state queue was full
    state_channel_drops: AtomicU64,

    /// Messages shed because the alert queue was full
    alert_channel_drops: AtomicU64,
}

impl IngestionMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            db_write_success: AtomicU64::new(0),
            db_write_failures: AtomicU64::new(0),
            db_channel_drops: AtomicU64::new(0),
            state_channel_drops: AtomicU64::new(0),
            alert_channel_drops: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful bulk insert of `count` messages
    #[inline]
    pub fn record_db_write_success(&self, count: u64) {
        self.db_write_success.fetch_add(count, Ordering::Relaxed);
    }

    /// Record `count` messages lost after the retry also failed
    #[inline]
    pub fn record_db_write_failures(&self, count: u64) {
        self.db_write_failures.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_db_channel_drop(&self) {
        self.db_channel_drops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_state_channel_drop(&self) {
        self.state_channel_drops.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert_channel_drop(&self) {
        self.alert_channel_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            db_write_success: self.db_write_success.load(Ordering::Relaxed),
            db_write_failures: self.db_write_failures.load(Ordering::Relaxed),
            db_channel_drops: self.db_channel_drops.load(Ordering::Relaxed),
            state_channel_drops: self.state_channel_drops.load(Ordering::Relaxed),
            alert_channel_drops: self.alert_channel_drops.load(Ordering::Relaxed),
        }
    }

    /// Render the counters in the text exposition format served on `/metrics`.
    pub fn render_text(&self) -> String {
        let s = self.snapshot();
        format!(
            "ingestion_messages_received_total {}\n\
             ingestion_db_write_success_total {}\n\
             ingestion_db_write_failures_total {}\n\
             ingestion_db_channel_drops_total {}\n\
             ingestion_state_channel_drops_total {}\n\
             ingestion_alert_channel_drops_total {}\n",
            s.messages_received,
            s.db_write_success,
            s.db_write_failures,
            s.db_channel_drops,
            s.state_channel_drops,
            s.alert_channel_drops,
        )
    }
}

/// Point-in-time snapshot of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub db_write_success: u64,
    pub db_write_failures: u64,
    pub db_channel_drops: u64,
    pub state_channel_drops: u64,
    pub alert_channel_drops: u64,
}
