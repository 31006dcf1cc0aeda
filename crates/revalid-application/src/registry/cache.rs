//! Cache Provider Registry
//!
//! Providers register themselves with `#[linkme::distributed_slice(CACHE_PROVIDERS)]`
//! and are discovered at runtime by name.

use revalid_domain::error::{Error, Result};
use revalid_domain::ports::{CacheProvider, SharedClock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for cache provider creation
///
/// Contains all configuration options that a cache provider might need.
/// Providers use what they need and ignore the rest.
#[derive(Debug, Clone)]
pub struct CacheProviderConfig {
    /// Provider name (e.g., "memory", "moka", "redis", "null")
    pub provider: String,
    /// Connection URI (for distributed caches)
    pub uri: Option<String>,
    /// Maximum number of entries
    pub max_entries: Option<u64>,
    /// Namespace prefix for keys
    pub namespace: Option<String>,
    /// Clock used for entry timestamps and expiry
    pub clock: SharedClock,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

impl Default for CacheProviderConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            uri: None,
            max_entries: None,
            namespace: None,
            clock: SystemClock::shared(),
            extra: HashMap::new(),
        }
    }
}

impl CacheProviderConfig {
    /// Create a new config with the given provider name
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Set the URI
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Add extra configuration
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Registry entry for cache providers
pub struct CacheProviderEntry {
    /// Unique provider name (e.g., "moka", "redis", "null")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create provider instance
    pub factory: fn(&CacheProviderConfig) -> Result<Arc<dyn CacheProvider>>,
}

#[linkme::distributed_slice]
pub static CACHE_PROVIDERS: [CacheProviderEntry] = [..];

/// Resolve cache provider by name from registry
///
/// # Returns
/// * `Ok(Arc<dyn CacheProvider>)` - Created provider instance
/// * `Err(Error::Configuration)` - Provider not found or creation failed
pub fn resolve_cache_provider(config: &CacheProviderConfig) -> Result<Arc<dyn CacheProvider>> {
    if let Some(entry) = CACHE_PROVIDERS.iter().find(|e| e.name == config.provider) {
        return (entry.factory)(config);
    }

    let available: Vec<&str> = CACHE_PROVIDERS.iter().map(|e| e.name).collect();
    Err(Error::configuration(format!(
        "Unknown cache provider '{}'. Available providers: {:?}",
        config.provider, available
    )))
}

/// List all registered cache providers as (name, description) pairs
pub fn list_cache_providers() -> Vec<(&'static str, &'static str)> {
    CACHE_PROVIDERS
        .iter()
        .map(|e| (e.name, e.description))
        .collect()
}
