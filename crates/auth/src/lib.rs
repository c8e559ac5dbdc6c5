//! API key validation
//!
//! Three tiers, consulted in order on every request:
//!
//! 1. **Static allowlist**: keys from configuration, never revoked at
//!    runtime.
//! 2. **Local cache**: a concurrent map of keys resolved recently. Expired
//!    entries are removed on access.
//! 3. **Authoritative lookup**: the live store's API-key mapping. A hit
//!    populates the local cache with the configured TTL.
//!
//! Tiers 1 and 2 take no global lock, so validation stays cheap under
//! parallel load. Revocation latency is bounded by the cache TTL. Any
//! transport error on tier 3 denies the key.

mod validator;

pub use validator::ApiKeyValidator;
