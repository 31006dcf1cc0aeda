//! Event transport configuration types

use crate::constants::DEFAULT_EVENT_PROVIDER;
use revalid_application::registry::EventProviderConfig;
use revalid_domain::ports::SharedClock;
use revalid_providers::constants::{EVENTS_DEFAULT_CAPACITY, NATS_DEFAULT_SUBJECT_PREFIX};
use serde::{Deserialize, Serialize};

/// Event transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Connect the client to an event transport at all
    pub enabled: bool,

    /// Registered provider name ("tokio", "nats", "null")
    pub provider: String,

    /// Buffer capacity for the in-process broadcast provider
    pub capacity: usize,

    /// NATS server URL
    /// Example: "nats://localhost:4222"
    pub nats_url: Option<String>,

    /// Subject prefix for published events
    pub subject_prefix: String,

    /// Client name reported to the NATS server
    pub client_name: Option<String>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: DEFAULT_EVENT_PROVIDER.to_string(),
            capacity: EVENTS_DEFAULT_CAPACITY,
            nats_url: None,
            subject_prefix: NATS_DEFAULT_SUBJECT_PREFIX.to_string(),
            client_name: None,
        }
    }
}

impl EventsConfig {
    /// Registry configuration for this section
    pub fn to_provider_config(&self, clock: SharedClock) -> EventProviderConfig {
        let mut config = EventProviderConfig::new(self.provider.as_str())
            .with_capacity(self.capacity)
            .with_subject_prefix(self.subject_prefix.as_str())
            .with_clock(clock);
        if let Some(url) = &self.nats_url {
            config = config.with_url(url.as_str());
        }
        if let Some(name) = &self.client_name {
            config = config.with_client_name(name.as_str());
        }
        config
    }
}
