//! Event Provider Registry
//!
//! Providers register themselves with `#[linkme::distributed_slice(EVENT_PROVIDERS)]`
//! and are discovered at runtime by name.

use revalid_domain::error::{Error, Result};
use revalid_domain::ports::{EventProvider, SharedClock, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for event provider creation
#[derive(Debug, Clone)]
pub struct EventProviderConfig {
    /// Provider name (e.g., "tokio", "nats", "null")
    pub provider: String,
    /// Server URL (for brokers)
    pub url: Option<String>,
    /// Subject or channel prefix
    pub subject_prefix: Option<String>,
    /// Client name announced to the broker
    pub client_name: Option<String>,
    /// Buffer capacity for in-process channels
    pub capacity: Option<usize>,
    /// Clock used for connection state timestamps
    pub clock: SharedClock,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

impl Default for EventProviderConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            url: None,
            subject_prefix: None,
            client_name: None,
            capacity: None,
            clock: SystemClock::shared(),
            extra: HashMap::new(),
        }
    }
}

impl EventProviderConfig {
    /// Create a new config with the given provider name
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Set the server URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the subject prefix
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = Some(prefix.into());
        self
    }

    /// Set the client name
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Set the channel capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

/// Registry entry for event providers
pub struct EventProviderEntry {
    /// Unique provider name (e.g., "tokio", "nats", "null")
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create provider instance
    pub factory: fn(&EventProviderConfig) -> Result<Arc<dyn EventProvider>>,
}

#[linkme::distributed_slice]
pub static EVENT_PROVIDERS: [EventProviderEntry] = [..];

/// Resolve event provider by name from registry
pub fn resolve_event_provider(config: &EventProviderConfig) -> Result<Arc<dyn EventProvider>> {
    if let Some(entry) = EVENT_PROVIDERS.iter().find(|e| e.name == config.provider) {
        return (entry.factory)(config);
    }

    let available: Vec<&str> = EVENT_PROVIDERS.iter().map(|e| e.name).collect();
    Err(Error::configuration(format!(
        "Unknown event provider '{}'. Available providers: {:?}",
        config.provider, available
    )))
}

/// List all registered event providers as (name, description) pairs
pub fn list_event_providers() -> Vec<(&'static str, &'static str)> {
    EVENT_PROVIDERS
        .iter()
        .map(|e| (e.name, e.description))
        .collect()
}
