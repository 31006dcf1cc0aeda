//! Provider Registry System
//!
//! Compile-time registration of cache and event providers via `linkme`
//! distributed slices. Providers declare an entry; configuration picks one
//! by name at runtime.
//!
//! ## Architecture
//!
//! ```text
//! 1. Provider defines:  #[linkme::distributed_slice(CACHE_PROVIDERS)]
//!                       static ENTRY: CacheProviderEntry = ...
//! 2. Registry declares: #[linkme::distributed_slice]
//!                       pub static CACHE_PROVIDERS: [CacheProviderEntry] = [..]
//! 3. Resolver queries:  CACHE_PROVIDERS.iter()
//! 4. Config selects:    provider = "redis" -> RedisCacheProvider
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use revalid_application::registry::{CacheProviderConfig, resolve_cache_provider};
//!
//! let config = CacheProviderConfig::new("moka").with_max_entries(10_000);
//! let cache = resolve_cache_provider(&config)?;
//! ```

pub mod cache;
pub mod events;

pub use cache::{
    CACHE_PROVIDERS, CacheProviderConfig, CacheProviderEntry, list_cache_providers,
    resolve_cache_provider,
};
pub use events::{
    EVENT_PROVIDERS, EventProviderConfig, EventProviderEntry, list_event_providers,
    resolve_event_provider,
};
