//! Root configuration

use super::{CacheConfig, EventsConfig, KeysConfig, LoggingConfig, QueryConfig};
use serde::{Deserialize, Serialize};

/// Application configuration
///
/// Every section falls back to its defaults, so a configuration file only
/// needs the values it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Identity stamped on published events; generated when absent
    pub instance_id: Option<String>,

    /// Cache backend
    pub cache: CacheConfig,

    /// Event transport
    pub events: EventsConfig,

    /// Key canonicalization
    pub keys: KeysConfig,

    /// Default query behaviour
    pub query: QueryConfig,

    /// Logging
    pub logging: LoggingConfig,
}
