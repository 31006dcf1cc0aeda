//! # revalid
//!
//! Stale-while-revalidate query and mutation cache with pluggable cache
//! backends and distributed invalidation.
//!
//! A [`QueryClient`] answers reads from the cache, serves stale data
//! immediately while refreshing it in the background, runs mutations that
//! invalidate the queries they affect, and broadcasts invalidations so every
//! instance sharing an event transport drops the same keys.
//!
//! ## Example
//!
//! ```no_run
//! use revalid::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> revalid::Result<()> {
//! let cache = Arc::new(MemoryCacheProvider::new());
//! let events = Arc::new(TokioEventProvider::new());
//! let client = QueryClient::builder(cache).with_events(events).build().await?;
//!
//! let ct = CancellationToken::new();
//! let key = QueryKey::from(["users", "42"]);
//! let user = client
//!     .query(&key, || async { Ok("Ada".to_string()) }, &QueryOptions::new(), &ct)
//!     .await?;
//! assert!(!user.is_from_cache());
//!
//! client
//!     .mutate(
//!         || async { Ok(()) },
//!         &MutationOptions::new().invalidate(["users", "42"]),
//!         &ct,
//!     )
//!     .await?;
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - `domain` - Keys, entries, options, events, error type and ports
//! - `application` - The query client and provider registries
//! - `providers` - Cache and event backends
//! - `infrastructure` - Configuration, logging and bootstrap

/// Domain layer - core types and port traits
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use revalid_domain::*;
}

/// Application layer - query client orchestration
///
/// Re-exports from the application crate for convenience
pub mod application {
    pub use revalid_application::*;
}

/// Provider implementations
///
/// Re-exports from the providers crate for convenience
pub mod providers {
    pub use revalid_providers::*;
}

/// Infrastructure layer - configuration, logging and bootstrap
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use revalid_infrastructure::*;
}

/// Commonly used types in one import
pub mod prelude {
    pub use revalid_application::{QueryClient, QueryClientBuilder, QueryTarget};
    pub use revalid_domain::ports::{
        CacheProvider, CacheProviderExt, Clock, EventProvider, KeyGenerator, handler_fn,
    };
    pub use revalid_domain::{
        CacheEntryOptions, CacheEntryPriority, CacheInvalidationEvent, CacheUpdatedEvent, Error,
        InvalidationReason, MutationOptions, OptimisticMutationOptions, QueryKey, QueryOptions,
        QueryResult, Result,
    };
    pub use revalid_infrastructure::{AppConfig, ConfigLoader, build_query_client};
    pub use revalid_providers::{MemoryCacheProvider, NullEventProvider, TokioEventProvider};
    pub use tokio_util::sync::CancellationToken;
}

// Re-export commonly used domain types at the crate root
pub use domain::*;

// Re-export the main entry points at the crate root
pub use application::{QueryClient, QueryClientBuilder, QueryTarget};
pub use infrastructure::{build_query_client, init_from_config};
