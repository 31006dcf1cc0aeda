//! Cache configuration types

use crate::constants::DEFAULT_CACHE_PROVIDER;
use revalid_application::registry::CacheProviderConfig;
use revalid_domain::ports::SharedClock;
use revalid_providers::constants::{CACHE_DEFAULT_MAX_ENTRIES, REDIS_DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Registered provider name ("moka", "memory", "redis", "null")
    pub provider: String,

    /// Maximum number of entries for bounded in-process providers
    pub max_entries: u64,

    /// Redis connection URL (required for the redis provider)
    /// Example: "redis://localhost:6379"
    pub redis_url: Option<String>,

    /// Key namespace for shared backends
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_CACHE_PROVIDER.to_string(),
            max_entries: CACHE_DEFAULT_MAX_ENTRIES,
            redis_url: None,
            namespace: REDIS_DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Registry configuration for this section
    pub fn to_provider_config(&self, clock: SharedClock) -> CacheProviderConfig {
        let mut config = CacheProviderConfig::new(self.provider.as_str())
            .with_max_entries(self.max_entries)
            .with_namespace(self.namespace.as_str())
            .with_clock(clock);
        if let Some(url) = &self.redis_url {
            config = config.with_uri(url.as_str());
        }
        config
    }
}
