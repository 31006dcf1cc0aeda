//! Domain Port Interfaces
//!
//! Boundary contracts between the domain and the outer layers. High-level
//! modules (the query client) depend on these traits; the providers crate
//! implements them.
//!
//! ## Organization
//!
//! - **clock** - Source of "now" for staleness and expiry
//! - **key_generator** - Composite key canonicalization and validation
//! - **providers/** - Cache and event backends

/// Time source port
pub mod clock;
/// Key canonicalization port
pub mod key_generator;
/// Backend provider ports
pub mod providers;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use key_generator::{KeyGenerator, contains_potential_injection};
pub use providers::{
    CacheProvider, CacheProviderExt, ConnectionStateStream, EventHandler, EventProvider,
    FnHandler, SubscriptionId, handler_fn,
};
