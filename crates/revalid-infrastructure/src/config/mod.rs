//! Configuration
//!
//! `AppConfig` is loaded by [`ConfigLoader`] from serialized defaults, an
//! optional TOML file and `REVALID__`-prefixed environment variables.

/// Configuration loader
pub mod loader;
/// Configuration sections
pub mod types;

pub use loader::ConfigLoader;
pub use types::{AppConfig, CacheConfig, EventsConfig, KeysConfig, LoggingConfig, QueryConfig};
