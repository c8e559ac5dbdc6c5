//! State writer for the live dashboard view
//!
//! Micro-batches readings and applies each one to the live store as a
//! grouped command (state hash + expiry + geo index + published snapshot).
//! The interval and buffer size are fixed: 50 ms keeps the dashboard
//! feeling live, and the live store is fast enough that a small buffer
//! suffices. There is no retry; the next reading from the same vehicle
//! supersedes any missed update.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use fleet_domain::TelemetryMessage;
use fleet_store::LiveStore;

use crate::MessageRx;

const BUFFER_SIZE: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Micro-batching worker on the state path
pub struct StateWriter {
    id: usize,
    rx: MessageRx,
    live: Arc<dyn LiveStore>,
}

impl StateWriter {
    pub fn new(id: usize, rx: MessageRx, live: Arc<dyn LiveStore>) -> Self {
        Self { id, rx, live }
    }

    /// Run until cancelled or the queue closes, flushing the buffer one
    /// last time on the way out.
    pub async fn run(self, cancel: CancellationToken) {
        let mut buffer: Vec<Arc<TelemetryMessage>> = Vec::with_capacity(BUFFER_SIZE);
        let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

        tracing::debug!(worker = self.id, "state writer starting");

        loop {
            tokio::select! {
                res = self.rx.recv() => match res {
                    Ok(msg) => {
                        buffer.push(msg);
                        if buffer.len() >= BUFFER_SIZE {
                            self.flush(&mut buffer).await;
                        }
                    }
                    Err(_) => break,
                },
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut buffer).await;
        }

        tracing::debug!(worker = self.id, "state writer stopped");
    }

    /// Apply each buffered reading. A failure affects only that message.
    async fn flush(&self, buffer: &mut Vec<Arc<TelemetryMessage>>) {
        for msg in buffer.drain(..) {
            if let Err(e) = self.live.state_update(&msg).await {
                tracing::warn!(
                    worker = self.id,
                    vehicle_id = %msg.vehicle_id,
                    error = %e,
                    "state update failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{message, MockLiveStore};

    struct Harness {
        tx: crossfire::MAsyncTx<Arc<TelemetryMessage>>,
        live: Arc<MockLiveStore>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_writer(live: Arc<MockLiveStore>) -> Harness {
        let (tx, rx) = crossfire::mpmc::bounded_async(64);
        let cancel = CancellationToken::new();
        let writer = StateWriter::new(0, rx, Arc::clone(&live) as Arc<dyn LiveStore>);
        let handle = tokio::spawn(writer.run(cancel.clone()));
        Harness {
            tx,
            live,
            cancel,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn updates_flow_on_tick() {
        let h = spawn_writer(MockLiveStore::new());

        h.tx.send(Arc::new(message("veh-1"))).await.unwrap();
        h.tx.send(Arc::new(message("veh-2"))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(h.live.updated_vehicles(), vec!["veh-1", "veh-2"]);

        h.cancel.cancel();
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_stop_the_batch() {
        let live = Arc::new(MockLiveStore {
            fail_state_for: Some("veh-bad".into()),
            ..Default::default()
        });
        let h = spawn_writer(live);

        h.tx.send(Arc::new(message("veh-1"))).await.unwrap();
        h.tx.send(Arc::new(message("veh-bad"))).await.unwrap();
        h.tx.send(Arc::new(message("veh-3"))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        // The failing vehicle is skipped, the rest land
        assert_eq!(h.live.updated_vehicles(), vec!["veh-1", "veh-3"]);

        h.cancel.cancel();
        h.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_buffered_updates() {
        let h = spawn_writer(MockLiveStore::new());

        h.tx.send(Arc::new(message("veh-1"))).await.unwrap();
        // Yield so the worker buffers the message before the tick fires
        tokio::time::sleep(Duration::from_millis(1)).await;

        h.cancel.cancel();
        h.handle.await.unwrap();

        assert_eq!(h.live.updated_vehicles(), vec!["veh-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_flushes_and_exits() {
        let h = spawn_writer(MockLiveStore::new());

        h.tx.send(Arc::new(message("veh-1"))).await.unwrap();
        drop(h.tx);

        h.handle.await.unwrap();
        assert_eq!(h.live.updated_vehicles(), vec!["veh-1"]);
    }
}
