//! Provider Constants
//!
//! Constants specific to provider implementations. Domain constants (key
//! limits, default stale and cache times) live in revalid-domain.

// ============================================================================
// CACHE PROVIDER CONSTANTS
// ============================================================================

/// Default maximum number of entries for in-memory caches
pub const CACHE_DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default Redis connection URL
pub const REDIS_DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Default namespace prefixed to every Redis key
pub const REDIS_DEFAULT_NAMESPACE: &str = "revalid";

/// Cache namespace separator
pub const CACHE_NAMESPACE_SEPARATOR: &str = ":";

/// Redis key segment for entry data
pub const REDIS_DATA_SEGMENT: &str = "d";

/// Redis key segment for tag index sets
pub const REDIS_TAG_SEGMENT: &str = "t";

// ============================================================================
// EVENT PROVIDER CONSTANTS
// ============================================================================

/// Default broadcast channel capacity
pub const EVENTS_DEFAULT_CAPACITY: usize = 1024;

/// Capacity of the connection state notification channel
pub const CONNECTION_STATE_CAPACITY: usize = 64;

/// Default NATS server URL
pub const NATS_DEFAULT_URL: &str = "nats://127.0.0.1:4222";

/// Default NATS subject prefix
pub const NATS_DEFAULT_SUBJECT_PREFIX: &str = "revalid.cache";

/// NATS subject suffix for invalidation events
pub const NATS_INVALIDATION_SUBJECT: &str = "invalidated";

/// NATS subject suffix for update events
pub const NATS_UPDATE_SUBJECT: &str = "updated";
