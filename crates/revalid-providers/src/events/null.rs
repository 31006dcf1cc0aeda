//! Null event provider
//!
//! Accepts every publish and subscription and delivers nothing. A query
//! client on this provider behaves like a standalone instance.

use async_trait::async_trait;
use futures::stream;
use revalid_domain::error::Result;
use revalid_domain::events::{CacheInvalidationEvent, CacheUpdatedEvent};
use revalid_domain::ports::{ConnectionStateStream, EventHandler, EventProvider, SubscriptionId};
use std::sync::Arc;
use tracing::debug;

/// No-op event provider
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventProvider;

impl NullEventProvider {
    /// Create a null provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventProvider for NullEventProvider {
    async fn publish_invalidation(&self, event: &CacheInvalidationEvent) -> Result<()> {
        debug!(keys = event.keys.len(), "Null provider dropped invalidation");
        Ok(())
    }

    async fn publish_update(&self, _event: &CacheUpdatedEvent) -> Result<()> {
        Ok(())
    }

    async fn subscribe_to_invalidations(
        &self,
        _handler: Arc<dyn EventHandler<CacheInvalidationEvent>>,
    ) -> Result<SubscriptionId> {
        Ok(SubscriptionId::new())
    }

    async fn subscribe_to_updates(
        &self,
        _handler: Arc<dyn EventHandler<CacheUpdatedEvent>>,
    ) -> Result<SubscriptionId> {
        Ok(SubscriptionId::new())
    }

    async fn unsubscribe(&self, _id: SubscriptionId) -> Result<bool> {
        Ok(false)
    }

    async fn is_connected(&self) -> bool {
        true
    }

    async fn ensure_connected(&self) -> Result<()> {
        Ok(())
    }

    fn connection_state_changes(&self) -> ConnectionStateStream {
        Box::pin(stream::empty())
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{EVENT_PROVIDERS, EventProviderConfig, EventProviderEntry};

#[linkme::distributed_slice(EVENT_PROVIDERS)]
static NULL_PROVIDER: EventProviderEntry = EventProviderEntry {
    name: "null",
    description: "No-op event transport",
    factory: |_config: &EventProviderConfig| Ok(Arc::new(NullEventProvider::new())),
};
