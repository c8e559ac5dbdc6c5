//! Layered API key validator

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use fleet_store::LiveStore;

#[derive(Debug, Clone)]
struct CacheEntry {
    /// The identity the key resolved to. All concurrent writers for the
    /// same key agree on this value, so last-writer-wins is fine.
    #[allow(dead_code)]
    identity: String,
    expires_at: DateTime<Utc>,
}

/// Three-tier API key validator
///
/// Safe to call from many tasks concurrently; the cache is a concurrent map
/// with per-entry eviction on expired reads.
pub struct ApiKeyValidator {
    static_keys: HashSet<String>,
    cache: DashMap<String, CacheEntry>,
    live: Arc<dyn LiveStore>,
    ttl: Duration,
}

impl ApiKeyValidator {
    /// Build a validator. Empty strings in the static allowlist are ignored.
    pub fn new(
        static_keys: impl IntoIterator<Item = String>,
        ttl_seconds: u64,
        live: Arc<dyn LiveStore>,
    ) -> Self {
        Self {
            static_keys: static_keys.into_iter().filter(|k| !k.is_empty()).collect(),
            cache: DashMap::new(),
            live,
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Validate an API key.
    ///
    /// Never returns `true` for a key absent from the static allowlist
    /// without a positive authoritative lookup; lookup errors fail closed.
    pub async fn validate(&self, api_key: &str) -> bool {
        // Tier 1: static config keys
        if self.static_keys.contains(api_key) {
            return true;
        }

        // Tier 2: local cache, evicting stale entries on access
        if let Some(entry) = self.cache.get(api_key) {
            if Utc::now() < entry.expires_at {
                return true;
            }
            drop(entry);
            self.cache.remove(api_key);
        }

        // Tier 3: authoritative lookup
        match self.live.lookup_api_key(api_key).await {
            Ok(Some(identity)) => {
                self.cache.insert(
                    api_key.to_string(),
                    CacheEntry {
                        identity,
                        expires_at: Utc::now() + self.ttl,
                    },
                );
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "api key lookup failed, denying");
                false
            }
        }
    }

    /// Number of cached entries (stale entries included until next access)
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fleet_domain::{AlertType, TelemetryMessage};
    use fleet_store::{Result as StoreResult, StoreError};

    /// Live-store fake that counts authoritative lookups
    struct FakeLiveStore {
        keys: HashMap<String, String>,
        lookups: AtomicUsize,
        fail: bool,
    }

    impl FakeLiveStore {
        fn with_keys(pairs: &[(&str, &str)]) -> Self {
            Self {
                keys: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                lookups: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                keys: HashMap::new(),
                lookups: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LiveStore for FakeLiveStore {
        async fn lookup_api_key(&self, api_key: &str) -> StoreResult<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Connect("fake transport error".into()));
            }
            Ok(self.keys.get(api_key).cloned())
        }

        async fn state_update(&self, _msg: &TelemetryMessage) -> StoreResult<()> {
            Ok(())
        }

        async fn check_alert_dedup(
            &self,
            _vehicle_id: &str,
            _alert_type: AlertType,
        ) -> StoreResult<bool> {
            Ok(false)
        }

        async fn set_alert_dedup(
            &self,
            _vehicle_id: &str,
            _alert_type: AlertType,
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn publish_alert(&self, _fleet_id: &str, _payload: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn validator(
        static_keys: &[&str],
        live: Arc<FakeLiveStore>,
    ) -> (ApiKeyValidator, Arc<FakeLiveStore>) {
        let v = ApiKeyValidator::new(
            static_keys.iter().map(|k| k.to_string()),
            300,
            Arc::clone(&live) as Arc<dyn LiveStore>,
        );
        (v, live)
    }

    #[tokio::test]
    async fn static_key_never_reaches_live_store() {
        let (v, live) = validator(&["k1", "k2"], Arc::new(FakeLiveStore::with_keys(&[])));

        assert!(v.validate("k1").await);
        assert!(v.validate("k2").await);
        assert_eq!(live.lookup_count(), 0);
    }

    #[tokio::test]
    async fn empty_static_keys_are_ignored() {
        let (v, live) = validator(&["", "k1"], Arc::new(FakeLiveStore::with_keys(&[])));

        assert!(v.validate("k1").await);
        assert!(!v.validate("").await);
        assert_eq!(live.lookup_count(), 1); // the "" probe fell through to tier 3
    }

    #[tokio::test]
    async fn unknown_key_is_denied() {
        let (v, live) = validator(&[], Arc::new(FakeLiveStore::with_keys(&[])));

        assert!(!v.validate("nope").await);
        assert_eq!(live.lookup_count(), 1);
        assert_eq!(v.cached_keys(), 0);
    }

    #[tokio::test]
    async fn cold_then_warm_cache() {
        let (v, live) = validator(
            &[],
            Arc::new(FakeLiveStore::with_keys(&[("K", "veh-7")])),
        );

        assert!(v.validate("K").await);
        assert_eq!(live.lookup_count(), 1);

        // Second call within TTL: served from cache
        assert!(v.validate("K").await);
        assert_eq!(live.lookup_count(), 1);
        assert_eq!(v.cached_keys(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_evicted_and_refetched() {
        let (v, live) = validator(
            &[],
            Arc::new(FakeLiveStore::with_keys(&[("K", "veh-7")])),
        );

        v.cache.insert(
            "K".to_string(),
            CacheEntry {
                identity: "veh-7".into(),
                expires_at: Utc::now() - Duration::seconds(1),
            },
        );

        assert!(v.validate("K").await);
        assert_eq!(live.lookup_count(), 1);

        // Repopulated with a fresh expiry
        let entry = v.cache.get("K").unwrap();
        assert!(entry.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn expired_entry_for_revoked_key_is_removed() {
        let (v, live) = validator(&[], Arc::new(FakeLiveStore::with_keys(&[])));

        v.cache.insert(
            "gone".to_string(),
            CacheEntry {
                identity: "veh-1".into(),
                expires_at: Utc::now() - Duration::seconds(1),
            },
        );

        assert!(!v.validate("gone").await);
        assert_eq!(live.lookup_count(), 1);
        assert_eq!(v.cached_keys(), 0);
    }

    #[tokio::test]
    async fn lookup_error_fails_closed() {
        let (v, live) = validator(&[], Arc::new(FakeLiveStore::failing()));

        assert!(!v.validate("K").await);
        assert_eq!(live.lookup_count(), 1);
        assert_eq!(v.cached_keys(), 0);
    }
}
