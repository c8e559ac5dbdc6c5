//! Server bootstrap
//!
//! Wires the stores, validator, dispatcher, and worker fan-out, then runs
//! the HTTP listener until a shutdown signal arrives. Store connection
//! failures here are the only fatal errors in the process; once the
//! pipelines are running, nothing downstream aborts it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fleet_auth::ApiKeyValidator;
use fleet_config::Config;
use fleet_metrics::IngestionMetrics;
use fleet_pipeline::{AlertEvaluator, DbWriter, Dispatcher, StateWriter};
use fleet_store::{
    LiveStore, RedisConfig, RedisStore, TelemetryStore, TimescaleConfig, TimescaleStore,
};

use crate::http::{build_router, AppState};

/// How long each worker gets to finish its final flush
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main server run loop
pub async fn run(cfg: Config) -> Result<()> {
    // One cancellation token observed by every worker and the HTTP server
    let cancel = CancellationToken::new();

    let timescale = Arc::new(
        TimescaleStore::connect(&TimescaleConfig {
            host: cfg.db_host.clone(),
            port: cfg.db_port,
            user: cfg.db_user.clone(),
            password: cfg.db_password.clone(),
            dbname: cfg.db_name.clone(),
            max_conns: cfg.db_max_conns,
        })
        .await
        .context("failed to connect to timescale")?,
    );

    let redis = Arc::new(
        RedisStore::connect(&RedisConfig {
            addr: cfg.redis_addr.clone(),
            password: cfg.redis_password.clone(),
            db: cfg.redis_db,
        })
        .await
        .context("failed to connect to redis")?,
    );

    let metrics = Arc::new(IngestionMetrics::new());

    let validator = Arc::new(ApiKeyValidator::new(
        cfg.valid_api_keys.iter().cloned(),
        cfg.auth_cache_ttl_seconds,
        Arc::clone(&redis) as Arc<dyn LiveStore>,
    ));

    let (dispatcher, channels) = Dispatcher::new(
        cfg.db_channel_size,
        cfg.state_channel_size,
        cfg.alert_channel_size,
        Arc::clone(&metrics),
    );

    // Worker fan-out: each stage is replicated over one shared queue
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    let flush_interval = Duration::from_millis(cfg.db_flush_interval_ms);
    for id in 0..cfg.db_writer_workers {
        let writer = DbWriter::new(
            id,
            channels.db_rx.clone(),
            Arc::clone(&timescale) as Arc<dyn TelemetryStore>,
            Arc::clone(&metrics),
            cfg.db_batch_size,
            flush_interval,
        );
        workers.push(tokio::spawn(writer.run(cancel.clone())));
    }

    for id in 0..cfg.state_writer_workers {
        let writer = StateWriter::new(
            id,
            channels.state_rx.clone(),
            Arc::clone(&redis) as Arc<dyn LiveStore>,
        );
        workers.push(tokio::spawn(writer.run(cancel.clone())));
    }

    for id in 0..cfg.alert_workers {
        let evaluator = AlertEvaluator::new(
            id,
            channels.alert_rx.clone(),
            Arc::clone(&timescale) as Arc<dyn TelemetryStore>,
            Arc::clone(&redis) as Arc<dyn LiveStore>,
        );
        workers.push(tokio::spawn(evaluator.run(cancel.clone())));
    }

    info!(
        db_writers = cfg.db_writer_workers,
        state_writers = cfg.state_writer_workers,
        alert_workers = cfg.alert_workers,
        "pipeline workers started"
    );

    let state = Arc::new(AppState {
        validator,
        dispatcher,
        metrics,
    });
    let app = build_router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.http_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(address = %bind_addr, "http listener ready");

    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping");

    cancel.cancel();

    // Each worker drains its current buffer once, then exits
    for task in workers {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "worker panicked during shutdown"),
            Err(_) => warn!("worker did not finish within timeout, continuing shutdown"),
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "http server error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "http server task panicked"),
        Err(_) => warn!("http server did not stop within timeout"),
    }

    info!("shutdown complete");
    Ok(())
}

/// Resolve on ctrl-c or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
