//! TimescaleDB adapter
//!
//! Connection-pooled access to the time-series store. Telemetry lands via
//! the binary COPY protocol; alerts are single-row inserts with conflicts
//! ignored. The telemetry table carries a generated geography column derived
//! from latitude/longitude; that belongs to the schema, the adapter never
//! writes it.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::binary_copy::BinaryCopyInWriter;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::NoTls;

use fleet_domain::{AlertSeverity, AlertType, TelemetryMessage};

use crate::error::{Result, StoreError};
use crate::traits::TelemetryStore;

/// Time-series store connection settings
#[derive(Debug, Clone)]
pub struct TimescaleConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_conns: usize,
}

/// Telemetry columns in COPY order
const TELEMETRY_COLUMNS: &[&str] = &[
    "timestamp",
    "vehicle_id",
    "fleet_id",
    "latitude",
    "longitude",
    "speed_kmh",
    "fuel_pct",
    "engine_temp_celsius",
    "battery_voltage",
    "odometer_km",
    "is_moving",
    "engine_on",
    "raw_payload",
];

const INSERT_ALERT: &str = "\
    INSERT INTO vehicle_alerts \
        (vehicle_id, fleet_id, alert_type, severity, triggered_value, created_at) \
    VALUES ($1, $2, $3, $4, $5, NOW()) \
    ON CONFLICT DO NOTHING";

fn copy_statement() -> String {
    format!(
        "COPY vehicle_telemetry ({}) FROM STDIN BINARY",
        TELEMETRY_COLUMNS.join(", ")
    )
}

fn column_types() -> Vec<Type> {
    vec![
        Type::TIMESTAMPTZ,
        Type::TEXT,
        Type::TEXT,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::FLOAT8,
        Type::BOOL,
        Type::BOOL,
        Type::TEXT,
    ]
}

/// Pooled TimescaleDB store
pub struct TimescaleStore {
    pool: Pool,
}

impl TimescaleStore {
    /// Create the pool and verify connectivity with a round-trip query.
    pub async fn connect(cfg: &TimescaleConfig) -> Result<Self> {
        let mut pool_cfg = deadpool_postgres::Config::new();
        pool_cfg.host = Some(cfg.host.clone());
        pool_cfg.port = Some(cfg.port);
        pool_cfg.user = Some(cfg.user.clone());
        pool_cfg.password = Some(cfg.password.clone());
        pool_cfg.dbname = Some(cfg.dbname.clone());
        pool_cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = pool_cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        pool.resize(cfg.max_conns);

        let store = Self { pool };
        store.ping().await?;

        tracing::info!(
            host = %cfg.host,
            port = cfg.port,
            dbname = %cfg.dbname,
            max_conns = cfg.max_conns,
            "connected to timescale"
        );

        Ok(store)
    }

    pub async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }
}

#[async_trait]
impl TelemetryStore for TimescaleStore {
    async fn insert_batch(&self, msgs: &[Arc<TelemetryMessage>]) -> Result<()> {
        if msgs.is_empty() {
            return Ok(());
        }

        let client = self.pool.get().await?;
        let sink = client.copy_in(&copy_statement()).await?;
        let types = column_types();
        let writer = BinaryCopyInWriter::new(sink, &types);
        tokio::pin!(writer);

        for msg in msgs {
            let raw_payload = String::from_utf8_lossy(&msg.raw_payload).into_owned();
            let row: [&(dyn ToSql + Sync); 13] = [
                &msg.timestamp,
                &msg.vehicle_id,
                &msg.fleet_id,
                &msg.latitude,
                &msg.longitude,
                &msg.speed_kmh,
                &msg.fuel_pct,
                &msg.engine_temp_c,
                &msg.battery_voltage,
                &msg.odometer_km,
                &msg.is_moving,
                &msg.engine_on,
                &raw_payload,
            ];
            writer.as_mut().write(&row).await?;
        }

        writer.as_mut().finish().await?;
        Ok(())
    }

    async fn insert_alert(
        &self,
        vehicle_id: &str,
        fleet_id: &str,
        alert_type: AlertType,
        severity: AlertSeverity,
        trigger_value: f64,
    ) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                INSERT_ALERT,
                &[
                    &vehicle_id,
                    &fleet_id,
                    &alert_type.as_str(),
                    &severity.as_str(),
                    &trigger_value,
                ],
            )
            .await?;
        Ok(())
    }
}
