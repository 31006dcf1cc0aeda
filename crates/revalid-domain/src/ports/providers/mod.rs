//! Provider Ports
//!
//! | Port | Description |
//! |------|-------------|
//! | [`CacheProvider`] | Entry storage with expiry, tags and bulk operations |
//! | [`EventProvider`] | Publish/subscribe transport for cache events |

/// Cache backend port
pub mod cache;
/// Event transport port
pub mod events;

pub use cache::{CacheProvider, CacheProviderExt};
pub use events::{
    ConnectionStateStream, EventHandler, EventProvider, FnHandler, SubscriptionId, handler_fn,
};
