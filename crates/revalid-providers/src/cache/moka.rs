//! Moka in-memory cache provider
//!
//! Bounded, concurrent in-memory cache. Each entry expires at the instant
//! its options computed, enforced both by Moka's per-entry expiry and by a
//! clock check on read.
//!
//! Access statistics are applied to the returned copy only; Moka entries
//! are not rewritten on read.
//!
//! ## Example
//!
//! ```ignore
//! use revalid_providers::cache::MokaCacheProvider;
//!
//! let provider = MokaCacheProvider::with_capacity(10_000);
//! ```

use crate::constants::CACHE_DEFAULT_MAX_ENTRIES;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use revalid_domain::entities::{CacheEntry, CacheEntryMetadata};
use revalid_domain::error::Result;
use revalid_domain::ports::{CacheProvider, SharedClock, SystemClock};
use revalid_domain::value_objects::CacheEntryOptions;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-entry expiry derived from the entry's own `expires_at`
struct EntryExpiry {
    clock: SharedClock,
}

impl EntryExpiry {
    fn remaining(&self, entry: &CacheEntry<String>) -> Option<Duration> {
        let expires_at = entry.expires_at?;
        Some(
            (expires_at - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

impl Expiry<String, CacheEntry<String>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<String>,
        _created_at: Instant,
    ) -> Option<Duration> {
        self.remaining(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<String>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.remaining(value)
    }
}

/// Moka-based in-memory cache provider
#[derive(Clone)]
pub struct MokaCacheProvider {
    cache: Cache<String, CacheEntry<String>>,
    clock: SharedClock,
    max_entries: u64,
}

impl Default for MokaCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MokaCacheProvider {
    /// Create a new Moka cache provider with default settings
    pub fn new() -> Self {
        Self::with_capacity(CACHE_DEFAULT_MAX_ENTRIES)
    }

    /// Create a new Moka cache provider with specified capacity
    pub fn with_capacity(max_entries: u64) -> Self {
        Self::with_config(max_entries, SystemClock::shared())
    }

    /// Create a new Moka cache provider with capacity and clock
    pub fn with_config(max_entries: u64, clock: SharedClock) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry {
                clock: clock.clone(),
            })
            .build();

        Self {
            cache,
            clock,
            max_entries,
        }
    }

    /// Get the maximum capacity of the cache
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    async fn live_entry(&self, key: &str) -> Option<CacheEntry<String>> {
        let entry = self.cache.get(key).await?;
        if entry.is_expired_at(self.clock.now()) {
            self.cache.invalidate(key).await;
            return None;
        }
        Some(entry)
    }
}

#[async_trait]
impl CacheProvider for MokaCacheProvider {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        let Some(mut entry) = self.live_entry(key).await else {
            return Ok(None);
        };
        entry.record_access(self.clock.now());
        Ok(Some(entry))
    }

    async fn set(&self, key: &str, payload: String, options: &CacheEntryOptions) -> Result<()> {
        let entry = CacheEntry::from_payload(payload, options, self.clock.now());
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<CacheEntryMetadata>> {
        Ok(self.live_entry(key).await.map(|entry| entry.metadata(key)))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let tagged: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.tags.contains(tag))
            .map(|(key, _)| String::clone(&key))
            .collect();
        for key in &tagged {
            self.cache.invalidate(key).await;
        }
        debug!(tag, removed = tagged.len(), "Invalidated tag");
        Ok(tagged.len())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        // Run pending tasks to ensure entry_count is accurate
        self.cache.run_pending_tasks().await;
        Ok(usize::try_from(self.cache.entry_count()).unwrap_or(usize::MAX))
    }

    fn provider_name(&self) -> &str {
        "moka"
    }
}

impl std::fmt::Debug for MokaCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheProvider")
            .field("max_entries", &self.max_entries)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{CACHE_PROVIDERS, CacheProviderConfig, CacheProviderEntry};

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static MOKA_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: "moka",
    description: "Moka bounded in-memory cache",
    factory: |config: &CacheProviderConfig| {
        let provider = MokaCacheProvider::with_config(
            config.max_entries.unwrap_or(CACHE_DEFAULT_MAX_ENTRIES),
            config.clock.clone(),
        );
        Ok(std::sync::Arc::new(provider))
    },
};
