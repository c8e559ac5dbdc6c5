//! Redis adapter
//!
//! The live store behind the dashboard and the credential path. One grouped
//! pipeline per state update keeps the dashboard view, the geospatial index,
//! and the pub/sub snapshot in a single round-trip.
//!
//! Key layout:
//!
//! - `vehicle:auth:{key}` → identity, no expiry
//! - `vehicle:{id}:state` → hash, 30 s expiry
//! - `fleet:{fleet}:geo` → geospatial set
//! - `fleet:{fleet}:telemetry` → pub/sub, JSON snapshots
//! - `fleet:{fleet}:alerts` → pub/sub, JSON alert notifications
//! - `alert:{vehicle}:{type}` → `"1"`, 5 min expiry

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};

use fleet_domain::{AlertType, TelemetryMessage};

use crate::error::{Result, StoreError};
use crate::traits::LiveStore;

/// Live-store pool size
const POOL_SIZE: usize = 20;

/// Expiry on the per-vehicle state hash
pub const STATE_TTL_SECS: i64 = 30;

/// Expiry on alert dedup marks
pub const DEDUP_TTL_SECS: i64 = 300;

/// Live store connection settings
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `host:port`
    pub addr: String,
    pub password: String,
    pub db: i64,
}

/// Pooled Redis store
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create the pool and verify connectivity with a PING.
    pub async fn connect(cfg: &RedisConfig) -> Result<Self> {
        let mut pool_cfg = deadpool_redis::Config::from_url(redis_url(cfg));
        pool_cfg.pool = Some(PoolConfig::new(POOL_SIZE));

        let pool = pool_cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let store = Self { pool };
        store.ping().await?;

        tracing::info!(addr = %cfg.addr, db = cfg.db, pool_size = POOL_SIZE, "connected to redis");

        Ok(store)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn redis_url(cfg: &RedisConfig) -> String {
    if cfg.password.is_empty() {
        format!("redis://{}/{}", cfg.addr, cfg.db)
    } else {
        format!("redis://:{}@{}/{}", cfg.password, cfg.addr, cfg.db)
    }
}

fn auth_key(api_key: &str) -> String {
    format!("vehicle:auth:{api_key}")
}

fn vehicle_state_key(vehicle_id: &str) -> String {
    format!("vehicle:{vehicle_id}:state")
}

fn fleet_geo_key(fleet_id: &str) -> String {
    format!("fleet:{fleet_id}:geo")
}

fn fleet_telemetry_channel(fleet_id: &str) -> String {
    format!("fleet:{fleet_id}:telemetry")
}

fn fleet_alerts_channel(fleet_id: &str) -> String {
    format!("fleet:{fleet_id}:alerts")
}

fn dedup_key(vehicle_id: &str, alert_type: AlertType) -> String {
    format!("alert:{vehicle_id}:{}", alert_type.as_str())
}

/// The JSON snapshot published on the fleet telemetry channel. The state
/// hash carries the same fields.
fn state_snapshot(msg: &TelemetryMessage) -> serde_json::Value {
    serde_json::json!({
        "vehicle_id": msg.vehicle_id,
        "fleet_id": msg.fleet_id,
        "lat": msg.latitude,
        "lng": msg.longitude,
        "speed_kmh": msg.speed_kmh,
        "fuel_pct": msg.fuel_pct,
        "engine_temp": msg.engine_temp_c,
        "battery": msg.battery_voltage,
        "is_moving": msg.is_moving,
        "engine_on": msg.engine_on,
        "timestamp": msg.timestamp.timestamp(),
        "received_at": msg.received_at.timestamp(),
    })
}

#[async_trait]
impl LiveStore for RedisStore {
    async fn lookup_api_key(&self, api_key: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        let identity: Option<String> = redis::cmd("GET")
            .arg(auth_key(api_key))
            .query_async(&mut conn)
            .await?;
        Ok(identity)
    }

    async fn state_update(&self, msg: &TelemetryMessage) -> Result<()> {
        let state_key = vehicle_state_key(&msg.vehicle_id);
        let payload = state_snapshot(msg).to_string();

        let mut pipe = redis::pipe();
        pipe.cmd("HSET")
            .arg(&state_key)
            .arg("vehicle_id")
            .arg(&msg.vehicle_id)
            .arg("fleet_id")
            .arg(&msg.fleet_id)
            .arg("lat")
            .arg(msg.latitude)
            .arg("lng")
            .arg(msg.longitude)
            .arg("speed_kmh")
            .arg(msg.speed_kmh)
            .arg("fuel_pct")
            .arg(msg.fuel_pct)
            .arg("engine_temp")
            .arg(msg.engine_temp_c)
            .arg("battery")
            .arg(msg.battery_voltage)
            .arg("is_moving")
            .arg(msg.is_moving)
            .arg("engine_on")
            .arg(msg.engine_on)
            .arg("timestamp")
            .arg(msg.timestamp.timestamp())
            .arg("received_at")
            .arg(msg.received_at.timestamp())
            .ignore();
        pipe.cmd("EXPIRE").arg(&state_key).arg(STATE_TTL_SECS).ignore();
        pipe.cmd("GEOADD")
            .arg(fleet_geo_key(&msg.fleet_id))
            .arg(msg.longitude)
            .arg(msg.latitude)
            .arg(&msg.vehicle_id)
            .ignore();
        pipe.cmd("PUBLISH")
            .arg(fleet_telemetry_channel(&msg.fleet_id))
            .arg(&payload)
            .ignore();

        let mut conn = self.pool.get().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn check_alert_dedup(&self, vehicle_id: &str, alert_type: AlertType) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(dedup_key(vehicle_id, alert_type))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    async fn set_alert_dedup(&self, vehicle_id: &str, alert_type: AlertType) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: () = redis::cmd("SET")
            .arg(dedup_key(vehicle_id, alert_type))
            .arg("1")
            .arg("EX")
            .arg(DEDUP_TTL_SECS)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn publish_alert(&self, fleet_id: &str, payload: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: () = redis::cmd("PUBLISH")
            .arg(fleet_alerts_channel(fleet_id))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
