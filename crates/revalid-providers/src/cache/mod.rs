//! Cache Provider Implementations
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | [`MemoryCacheProvider`] | Local | DashMap store evaluated against an injected clock |
//! | [`MokaCacheProvider`] | Local | Bounded cache with per-entry expiry |
//! | [`RedisCacheProvider`] | Distributed | Redis-backed for multi-instance |
//! | [`NullCacheProvider`] | Testing | No-op stub |
//!
//! ## Provider Selection Guide
//!
//! - **Tests with simulated time**: `MemoryCacheProvider` with a `ManualClock`
//! - **Single Instance**: `MokaCacheProvider` for bounded memory use
//! - **Multi Instance**: `RedisCacheProvider`, or a local cache per
//!   instance kept consistent through an event provider

pub mod memory;
#[cfg(feature = "cache-moka")]
pub mod moka;
pub mod null;
#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryCacheProvider;
#[cfg(feature = "cache-moka")]
pub use moka::MokaCacheProvider;
pub use null::NullCacheProvider;
#[cfg(feature = "cache-redis")]
pub use redis::RedisCacheProvider;
