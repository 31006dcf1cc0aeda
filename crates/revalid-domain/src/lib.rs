//! # Revalid Domain
//!
//! Core types of the revalid query cache: composite keys and their
//! canonicalization, cache entries with their stale/expired lifecycle,
//! per-query statistics, option bags, cache events and the ports that
//! backends implement.
//!
//! ## Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`value_objects`] | `QueryKey`, options, `QueryResult`, priority |
//! | [`entities`] | `CacheEntry`, `CacheEntryMetadata`, `QueryMetadata` |
//! | [`events`] | Invalidation, update and connection events |
//! | [`ports`] | `CacheProvider`, `EventProvider`, `KeyGenerator`, `Clock` |
//! | [`error`] | Error taxonomy and `Result` alias |
//!
//! This crate has no runtime dependency on any backend; it only defines
//! what a backend must do.

/// Domain constants
pub mod constants;
/// Entities with lifecycle
pub mod entities;
/// Error types
pub mod error;
/// Cache events
pub mod events;
/// Default key generator
pub mod key_generator;
/// Port traits
pub mod ports;
/// Value objects
pub mod value_objects;

pub use entities::{CacheEntry, CacheEntryMetadata, QueryMetadata};
pub use error::{Error, Result};
pub use events::{
    CacheInvalidationEvent, CacheUpdatedEvent, ConnectionStateChange, InvalidationReason,
};
pub use key_generator::DefaultKeyGenerator;
pub use value_objects::{
    CacheEntryOptions, CacheEntryPriority, MutationOptions, OptimisticMutationOptions,
    QueryKey, QueryOptions, QueryResult,
};
