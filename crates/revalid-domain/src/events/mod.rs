//! Domain Events
//!
//! | Event | Description |
//! |-------|-------------|
//! | [`CacheInvalidationEvent`] | Keys or tags that peers must evict |
//! | [`CacheUpdatedEvent`] | Keys that were rewritten |
//! | [`ConnectionStateChange`] | Event transport connected or disconnected |

/// Cache invalidation, update and connection events
pub mod cache_events;

pub use cache_events::{
    CacheInvalidationEvent, CacheUpdatedEvent, ConnectionStateChange, InvalidationReason,
};
