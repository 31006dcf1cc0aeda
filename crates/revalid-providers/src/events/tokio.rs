//! Tokio Broadcast Event Provider
//!
//! In-process event distribution over tokio broadcast channels. Every
//! query client sharing one provider instance sees the others' events,
//! which makes it the transport for single-process deployments and tests.
//!
//! ## Delivery
//!
//! The first subscription of each kind starts a pump task that receives
//! from the channel and dispatches to the registered handlers. Events are
//! ephemeral: anything published before that is not replayed.
//!
//! ## Example
//!
//! ```ignore
//! use revalid_providers::events::TokioEventProvider;
//!
//! let events = TokioEventProvider::new_shared();
//! events.subscribe_to_invalidations(handler).await?;
//! events.publish_invalidation(&event).await?;
//! ```

use super::dispatch::{ConnectionNotifier, HandlerRegistry, pump_broadcast};
use crate::constants::EVENTS_DEFAULT_CAPACITY;
use async_trait::async_trait;
use revalid_domain::error::Result;
use revalid_domain::events::{CacheInvalidationEvent, CacheUpdatedEvent};
use revalid_domain::ports::{
    ConnectionStateStream, EventHandler, EventProvider, SharedClock, SubscriptionId, SystemClock,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// One event kind: its channel, handlers and pump flag
struct Topic<E> {
    sender: broadcast::Sender<E>,
    handlers: Arc<HandlerRegistry<E>>,
    pumping: AtomicBool,
}

impl<E: Clone + Send + Sync + 'static> Topic<E> {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            handlers: Arc::new(HandlerRegistry::new()),
            pumping: AtomicBool::new(false),
        }
    }

    fn publish(&self, event: E) {
        match self.sender.send(event) {
            Ok(count) => {
                debug!("Published event to {} receivers", count);
            }
            Err(_) => {
                debug!("Published event but no subscribers");
            }
        }
    }

    fn subscribe(&self, handler: Arc<dyn EventHandler<E>>) -> SubscriptionId {
        let id = self.handlers.register(handler);
        if !self.pumping.swap(true, Ordering::SeqCst) {
            pump_broadcast(self.sender.subscribe(), Arc::clone(&self.handlers));
        }
        id
    }
}

/// Event provider using tokio broadcast channels
///
/// Cloning shares the channels.
#[derive(Clone)]
pub struct TokioEventProvider {
    invalidations: Arc<Topic<CacheInvalidationEvent>>,
    updates: Arc<Topic<CacheUpdatedEvent>>,
    notifier: Arc<ConnectionNotifier>,
    capacity: usize,
}

impl TokioEventProvider {
    /// Create a new provider with default capacity (1024)
    pub fn new() -> Self {
        Self::with_capacity(EVENTS_DEFAULT_CAPACITY)
    }

    /// Create with custom capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of buffered events per kind
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(capacity, SystemClock::shared())
    }

    /// Create with custom capacity and clock
    pub fn with_config(capacity: usize, clock: SharedClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            invalidations: Arc::new(Topic::new(capacity)),
            updates: Arc::new(Topic::new(capacity)),
            notifier: Arc::new(ConnectionNotifier::new(clock, true)),
            capacity,
        }
    }

    /// Create as Arc for sharing
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of registered handlers across both event kinds
    pub fn handler_count(&self) -> usize {
        self.invalidations.handlers.len() + self.updates.handlers.len()
    }
}

impl Default for TokioEventProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokioEventProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioEventProvider")
            .field("capacity", &self.capacity)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[async_trait]
impl EventProvider for TokioEventProvider {
    async fn publish_invalidation(&self, event: &CacheInvalidationEvent) -> Result<()> {
        self.invalidations.publish(event.clone());
        Ok(())
    }

    async fn publish_update(&self, event: &CacheUpdatedEvent) -> Result<()> {
        self.updates.publish(event.clone());
        Ok(())
    }

    async fn subscribe_to_invalidations(
        &self,
        handler: Arc<dyn EventHandler<CacheInvalidationEvent>>,
    ) -> Result<SubscriptionId> {
        let id = self.invalidations.subscribe(handler);
        debug!(subscription = %id, "Subscribed to invalidations");
        Ok(id)
    }

    async fn subscribe_to_updates(
        &self,
        handler: Arc<dyn EventHandler<CacheUpdatedEvent>>,
    ) -> Result<SubscriptionId> {
        let id = self.updates.subscribe(handler);
        debug!(subscription = %id, "Subscribed to updates");
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        Ok(self.invalidations.handlers.remove(id) || self.updates.handlers.remove(id))
    }

    async fn is_connected(&self) -> bool {
        self.notifier.is_connected()
    }

    async fn ensure_connected(&self) -> Result<()> {
        Ok(())
    }

    fn connection_state_changes(&self) -> ConnectionStateStream {
        self.notifier.stream()
    }

    fn provider_name(&self) -> &str {
        "tokio"
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{EVENT_PROVIDERS, EventProviderConfig, EventProviderEntry};

#[linkme::distributed_slice(EVENT_PROVIDERS)]
static TOKIO_PROVIDER: EventProviderEntry = EventProviderEntry {
    name: "tokio",
    description: "In-process tokio broadcast channels",
    factory: |config: &EventProviderConfig| {
        let provider = TokioEventProvider::with_config(
            config.capacity.unwrap_or(EVENTS_DEFAULT_CAPACITY),
            config.clock.clone(),
        );
        Ok(Arc::new(provider))
    },
};
