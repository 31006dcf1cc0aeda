//! Null cache provider
//!
//! Stores nothing. Every read is a miss, which turns the query client into
//! a pass-through to the fetch function.

use async_trait::async_trait;
use revalid_domain::entities::{CacheEntry, CacheEntryMetadata};
use revalid_domain::error::Result;
use revalid_domain::ports::CacheProvider;
use revalid_domain::value_objects::CacheEntryOptions;

/// No-op cache provider
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheProvider;

impl NullCacheProvider {
    /// Create a null provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheProvider for NullCacheProvider {
    async fn get_entry(&self, _key: &str) -> Result<Option<CacheEntry<String>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _payload: String, _options: &CacheEntryOptions) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn get_metadata(&self, _key: &str) -> Result<Option<CacheEntryMetadata>> {
        Ok(None)
    }

    async fn remove(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn invalidate_by_tag(&self, _tag: &str) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        Ok(0)
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{CACHE_PROVIDERS, CacheProviderConfig, CacheProviderEntry};

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static NULL_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: "null",
    description: "No-op cache (every read misses)",
    factory: |_config: &CacheProviderConfig| Ok(std::sync::Arc::new(NullCacheProvider::new())),
};
