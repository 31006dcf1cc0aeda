//! # Revalid Providers
//!
//! Backend adapters behind the `revalid-domain` ports. Every provider
//! registers itself in the `revalid-application` registries, so
//! configuration can select it by name.
//!
//! ## Cache Providers
//!
//! | Name | Type | Feature |
//! |------|------|---------|
//! | `memory` | DashMap store with lazy expiry | always |
//! | `moka` | Bounded in-memory cache | `cache-moka` (default) |
//! | `redis` | Distributed cache | `cache-redis` |
//! | `null` | No-op | always |
//!
//! ## Event Providers
//!
//! | Name | Type | Feature |
//! |------|------|---------|
//! | `tokio` | In-process broadcast | always |
//! | `nats` | Broker-backed pub/sub | `events-nats` |
//! | `null` | No-op | always |

pub mod cache;
pub mod constants;
pub mod events;

pub use cache::{MemoryCacheProvider, NullCacheProvider};
#[cfg(feature = "cache-moka")]
pub use cache::MokaCacheProvider;
#[cfg(feature = "cache-redis")]
pub use cache::RedisCacheProvider;
pub use events::{NullEventProvider, TokioEventProvider};
#[cfg(feature = "events-nats")]
pub use events::NatsEventProvider;
