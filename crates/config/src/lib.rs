//! Ingestion service configuration
//!
//! Every option is an environment variable with a default, so the service
//! starts with no configuration at all against local stores. Unparsable
//! numeric values fall back to the default rather than failing startup.

use std::env;
use std::str::FromStr;

/// Runtime configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub http_port: u16,

    // Time-series store (TimescaleDB)
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_max_conns: usize,

    // Live store (Redis)
    pub redis_addr: String,
    pub redis_password: String,
    pub redis_db: i64,

    // Pipeline queue capacities
    pub db_channel_size: usize,
    pub state_channel_size: usize,
    pub alert_channel_size: usize,

    // Bulk writer tuning
    pub db_batch_size: usize,
    pub db_flush_interval_ms: u64,

    // Worker counts per stage
    pub db_writer_workers: usize,
    pub state_writer_workers: usize,
    pub alert_workers: usize,

    // Auth
    pub auth_cache_ttl_seconds: u64,
    pub valid_api_keys: Vec<String>,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse("HTTP_PORT", 8001),
            db_host: env_or("DB_HOST", "localhost"),
            db_port: env_parse("DB_PORT", 5432),
            db_user: env_or("DB_USER", "fleet_user"),
            db_password: env_or("DB_PASSWORD", "fleet_password"),
            db_name: env_or("DB_NAME", "fleet_monitor"),
            db_max_conns: env_parse("DB_MAX_CONNS", 15),
            redis_addr: env_or("REDIS_ADDR", "localhost:6379"),
            redis_password: env_or("REDIS_PASSWORD", ""),
            redis_db: env_parse("REDIS_DB", 0),
            db_channel_size: env_parse("DB_CHANNEL_SIZE", 10_000),
            state_channel_size: env_parse("STATE_CHANNEL_SIZE", 50_000),
            alert_channel_size: env_parse("ALERT_CHANNEL_SIZE", 10_000),
            db_batch_size: env_parse("DB_BATCH_SIZE", 500),
            db_flush_interval_ms: env_parse("DB_FLUSH_INTERVAL_MS", 100),
            db_writer_workers: env_parse("DB_WRITER_WORKERS", 10),
            state_writer_workers: env_parse("STATE_WRITER_WORKERS", 5),
            alert_workers: env_parse("ALERT_WORKERS", 3),
            auth_cache_ttl_seconds: env_parse("AUTH_CACHE_TTL_SECONDS", 300),
            valid_api_keys: split_keys(&env_or("VALID_API_KEYS", "")),
        }
    }
}

impl Default for Config {
    /// The same values `from_env` yields with an empty environment.
    fn default() -> Self {
        Self {
            http_port: 8001,
            db_host: "localhost".into(),
            db_port: 5432,
            db_user: "fleet_user".into(),
            db_password: "fleet_password".into(),
            db_name: "fleet_monitor".into(),
            db_max_conns: 15,
            redis_addr: "localhost:6379".into(),
            redis_password: String::new(),
            redis_db: 0,
            db_channel_size: 10_000,
            state_channel_size: 50_000,
            alert_channel_size: 10_000,
            db_batch_size: 500,
            db_flush_interval_ms: 100,
            db_writer_workers: 10,
            state_writer_workers: 5,
            alert_workers: 3,
            auth_cache_ttl_seconds: 300,
            valid_api_keys: Vec::new(),
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

fn env_parse<T: FromStr + Copy>(key: &str, fallback: T) -> T {
    match env::var(key) {
        Ok(v) => parse_or(&v, fallback),
        Err(_) => fallback,
    }
}

fn parse_or<T: FromStr + Copy>(raw: &str, fallback: T) -> T {
    raw.trim().parse().unwrap_or(fallback)
}

/// Split the comma-separated allowlist, dropping empty entries.
fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.http_port, 8001);
        assert_eq!(cfg.db_max_conns, 15);
        assert_eq!(cfg.db_channel_size, 10_000);
        assert_eq!(cfg.state_channel_size, 50_000);
        assert_eq!(cfg.alert_channel_size, 10_000);
        assert_eq!(cfg.db_batch_size, 500);
        assert_eq!(cfg.db_flush_interval_ms, 100);
        assert_eq!(cfg.db_writer_workers, 10);
        assert_eq!(cfg.state_writer_workers, 5);
        assert_eq!(cfg.alert_workers, 3);
        assert_eq!(cfg.auth_cache_ttl_seconds, 300);
        assert!(cfg.valid_api_keys.is_empty());
    }

    #[test]
    fn parse_or_falls_back_on_garbage() {
        assert_eq!(parse_or("250", 100usize), 250);
        assert_eq!(parse_or(" 250 ", 100usize), 250);
        assert_eq!(parse_or("not-a-number", 100usize), 100);
        assert_eq!(parse_or("", 8001u16), 8001);
    }

    #[test]
    fn split_keys_drops_empties() {
        assert_eq!(split_keys("k1,k2"), vec!["k1", "k2"]);
        assert_eq!(split_keys("k1,,k2,"), vec!["k1", "k2"]);
        assert_eq!(split_keys(" k1 , k2 "), vec!["k1", "k2"]);
        assert!(split_keys("").is_empty());
        assert!(split_keys(",,").is_empty());
    }
}
