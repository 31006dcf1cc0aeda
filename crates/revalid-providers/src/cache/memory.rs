//! DashMap in-memory cache provider
//!
//! Entries are kept as full [`CacheEntry`] envelopes and evaluated lazily
//! against an injected [`Clock`](revalid_domain::ports::Clock): an expired
//! entry is dropped the first time it is read, never served.
//!
//! ## Capacity
//!
//! With a maximum entry count, inserting a new key into a full store first
//! purges expired entries, then evicts the least recently accessed entry of
//! the lowest evictable priority. `NeverRemove` entries are never evicted.
//!
//! ## Example
//!
//! ```ignore
//! use revalid_providers::cache::MemoryCacheProvider;
//! use revalid_domain::ports::ManualClock;
//! use std::sync::Arc;
//!
//! let clock = ManualClock::new();
//! let cache = MemoryCacheProvider::with_clock(Arc::new(clock.clone()));
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use revalid_domain::entities::{CacheEntry, CacheEntryMetadata};
use revalid_domain::error::Result;
use revalid_domain::ports::{CacheProvider, SharedClock, SystemClock};
use revalid_domain::value_objects::CacheEntryOptions;
use tracing::debug;

/// In-memory cache provider backed by a concurrent map
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    entries: std::sync::Arc<DashMap<String, CacheEntry<String>>>,
    clock: SharedClock,
    max_entries: Option<usize>,
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheProvider {
    /// Unbounded store on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Unbounded store on `clock`
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            entries: std::sync::Arc::new(DashMap::new()),
            clock,
            max_entries: None,
        }
    }

    /// Limit the number of stored entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Configured entry limit
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    fn live_entry(&self, key: &str) -> Option<CacheEntry<String>> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if entry.is_expired_at(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired_at(now));
            return None;
        }
        Some(entry.value().clone())
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before.saturating_sub(self.entries.len())
    }

    fn make_room(&self, key: &str) {
        let Some(limit) = self.max_entries else {
            return;
        };
        if self.entries.len() < limit || self.entries.contains_key(key) {
            return;
        }
        if self.purge_expired() > 0 && self.entries.len() < limit {
            return;
        }

        let victim = self
            .entries
            .iter()
            .filter(|entry| entry.priority.is_evictable())
            .min_by_key(|entry| (entry.priority, entry.last_accessed))
            .map(|entry| entry.key().clone());
        if let Some(victim) = victim {
            self.entries.remove(&victim);
            debug!(key = %victim, "Evicted cache entry to make room");
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        let now = self.clock.now();
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        if entry.is_expired_at(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired_at(now));
            return Ok(None);
        }
        entry.record_access(now);
        Ok(Some(entry.value().clone()))
    }

    async fn set(&self, key: &str, payload: String, options: &CacheEntryOptions) -> Result<()> {
        self.make_room(key);
        let entry = CacheEntry::from_payload(payload, options, self.clock.now());
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).is_some())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<CacheEntryMetadata>> {
        Ok(self.live_entry(key).map(|entry| entry.metadata(key)))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let tagged = entry.tags.contains(tag);
            if tagged {
                removed += 1;
            }
            !tagged
        });
        debug!(tag, removed, "Invalidated tag");
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        self.purge_expired();
        Ok(self.entries.len())
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{CACHE_PROVIDERS, CacheProviderConfig, CacheProviderEntry};

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static MEMORY_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: "memory",
    description: "DashMap in-memory cache with lazy expiry",
    factory: |config: &CacheProviderConfig| {
        let mut provider = MemoryCacheProvider::with_clock(config.clock.clone());
        if let Some(max_entries) = config.max_entries {
            provider = provider.with_max_entries(usize::try_from(max_entries).unwrap_or(usize::MAX));
        }
        Ok(std::sync::Arc::new(provider))
    },
};
