//! Event Provider Port
//!
//! Defines the contract for publishing and receiving cache invalidation and
//! update events between query client instances.
//!
//! ## Architecture
//!
//! Implementations (Tokio broadcast, NATS, null) live in the providers crate
//! and self-register in the event provider registry.
//!
//! ## Usage
//!
//! ```no_run
//! use revalid_domain::events::CacheInvalidationEvent;
//! use revalid_domain::ports::{EventProvider, handler_fn};
//! use std::sync::Arc;
//!
//! async fn listen(events: Arc<dyn EventProvider>) -> revalid_domain::Result<()> {
//!     let handler = handler_fn(|event: CacheInvalidationEvent| async move {
//!         println!("{} keys invalidated", event.keys.len());
//!         Ok(())
//!     });
//!     events.subscribe_to_invalidations(handler).await?;
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::events::{CacheInvalidationEvent, CacheUpdatedEvent, ConnectionStateChange};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

/// Boxed async stream of connection state changes
pub type ConnectionStateStream = Pin<Box<dyn Stream<Item = ConnectionStateChange> + Send + 'static>>;

/// Identifier returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiver of one kind of event
///
/// A failing handler only affects itself; providers log the failure and
/// keep dispatching to the other handlers.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
    /// Handle one event
    async fn handle(&self, event: &E) -> Result<()>;
}

/// Handler built from an async closure, see [`handler_fn`]
pub struct FnHandler<E, F> {
    f: F,
    _event: PhantomData<fn(E)>,
}

#[async_trait]
impl<E, F, Fut> EventHandler<E> for FnHandler<E, F>
where
    E: Clone + Send + Sync + 'static,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, event: &E) -> Result<()> {
        (self.f)(event.clone()).await
    }
}

/// Adapt an async closure taking the event by value into a shared handler
pub fn handler_fn<E, F, Fut>(f: F) -> Arc<dyn EventHandler<E>>
where
    E: Clone + Send + Sync + 'static,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        f,
        _event: PhantomData,
    })
}

/// Event Provider Port
///
/// ## Contract
///
/// - Publishing first establishes the connection and fails with
///   `EventPublish` or `EventConnection` errors, never silently
/// - Dispatch fans out to every registered handler; one handler's failure is
///   logged and never reaches its siblings or the publisher
/// - Connection state transitions are reported through
///   [`EventProvider::connection_state_changes`]
#[async_trait]
pub trait EventProvider: Send + Sync + std::fmt::Debug {
    /// Publish an invalidation event
    async fn publish_invalidation(&self, event: &CacheInvalidationEvent) -> Result<()>;

    /// Publish an update event
    async fn publish_update(&self, event: &CacheUpdatedEvent) -> Result<()>;

    /// Register a handler for invalidation events
    async fn subscribe_to_invalidations(
        &self,
        handler: Arc<dyn EventHandler<CacheInvalidationEvent>>,
    ) -> Result<SubscriptionId>;

    /// Register a handler for update events
    async fn subscribe_to_updates(
        &self,
        handler: Arc<dyn EventHandler<CacheUpdatedEvent>>,
    ) -> Result<SubscriptionId>;

    /// Remove a handler
    ///
    /// # Returns
    /// True if the subscription existed
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool>;

    /// Whether the transport is currently connected
    async fn is_connected(&self) -> bool;

    /// Connect if not connected
    async fn ensure_connected(&self) -> Result<()>;

    /// Stream of connection state transitions from now on
    fn connection_state_changes(&self) -> ConnectionStateStream;

    /// Provider identifier (e.g., "tokio", "nats", "null")
    fn provider_name(&self) -> &str;
}
