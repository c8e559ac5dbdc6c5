//! Bulk writer for the time-series store
//!
//! Each worker owns a private batch buffer and flushes on three triggers:
//! the buffer reaching the configured maximum, the periodic ticker, or
//! shutdown/queue-close (one final flush). A failed flush is retried once
//! after a fixed delay; a second failure counts the whole batch as lost and
//! moves on; the state and alert paths are unaffected.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fleet_domain::TelemetryMessage;
use fleet_metrics::IngestionMetrics;
use fleet_store::TelemetryStore;

use crate::MessageRx;

/// Delay before the single flush retry
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Batching worker on the DB path
pub struct DbWriter {
    id: usize,
    rx: MessageRx,
    store: Arc<dyn TelemetryStore>,
    metrics: Arc<IngestionMetrics>,
    batch_size: usize,
    flush_interval: Duration,
}

impl DbWriter {
    pub fn new(
        id: usize,
        rx: MessageRx,
        store: Arc<dyn TelemetryStore>,
        metrics: Arc<IngestionMetrics>,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            id,
            rx,
            store,
            metrics,
            batch_size,
            flush_interval,
        }
    }

    /// Run until cancelled or the queue closes. Messages are persisted in
    /// arrival order within a batch; nothing is promised across workers.
    pub async fn run(self, cancel: CancellationToken) {
        let mut batch: Vec<Arc<TelemetryMessage>> = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);

        tracing::debug!(
            worker = self.id,
            batch_size = self.batch_size,
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            "db writer starting"
        );

        loop {
            tokio::select! {
                res = self.rx.recv() => match res {
                    Ok(msg) => {
                        batch.push(msg);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    // queue closed upstream
                    Err(_) => break,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        self.flush(&mut batch).await;
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }

        tracing::debug!(worker = self.id, "db writer stopped");
    }

    /// Insert the batch, retrying once. The buffer is cleared either way.
    async fn flush(&self, batch: &mut Vec<Arc<TelemetryMessage>>) {
        if let Err(e) = self.store.insert_batch(batch).await {
            tracing::warn!(
                worker = self.id,
                batch = batch.len(),
                error = %e,
                "db write failed, retrying"
            );
            tokio::time::sleep(RETRY_DELAY).await;

            if let Err(e) = self.store.insert_batch(batch).await {
                tracing::error!(
                    worker = self.id,
                    batch = batch.len(),
                    error = %e,
                    "db write permanently failed, dropping batch"
                );
                self.metrics.record_db_write_failures(batch.len() as u64);
                batch.clear();
                return;
            }
        }

        self.metrics.record_db_write_success(batch.len() as u64);
        batch.clear();
    }
}
