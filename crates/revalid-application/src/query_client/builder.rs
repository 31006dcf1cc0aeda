//! Query client assembly

use super::metadata::MetadataStore;
use super::invalidation::RemoteInvalidationHandler;
use super::{Inner, QueryClient};
use revalid_domain::error::Result;
use revalid_domain::key_generator::DefaultKeyGenerator;
use revalid_domain::ports::{CacheProvider, EventProvider, KeyGenerator, SharedClock, SystemClock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use uuid::Uuid;

/// Builder for [`QueryClient`]
///
/// Only the cache is required. Without an event provider the client works
/// standalone: nothing is published and no remote invalidations arrive.
///
/// ```no_run
/// # async fn demo(
/// #     cache: std::sync::Arc<dyn revalid_domain::ports::CacheProvider>,
/// #     events: std::sync::Arc<dyn revalid_domain::ports::EventProvider>,
/// # ) -> revalid_domain::Result<()> {
/// use revalid_application::QueryClient;
///
/// let client = QueryClient::builder(cache)
///     .with_events(events)
///     .with_instance_id("api-1")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryClientBuilder {
    cache: Arc<dyn CacheProvider>,
    events: Option<Arc<dyn EventProvider>>,
    keys: Option<Arc<dyn KeyGenerator>>,
    clock: Option<SharedClock>,
    instance_id: Option<String>,
}

impl QueryClientBuilder {
    /// Builder around `cache`
    pub fn new(cache: Arc<dyn CacheProvider>) -> Self {
        Self {
            cache,
            events: None,
            keys: None,
            clock: None,
            instance_id: None,
        }
    }

    /// Publish events to and receive invalidations from `events`
    pub fn with_events(mut self, events: Arc<dyn EventProvider>) -> Self {
        self.events = Some(events);
        self
    }

    /// Replace the default key generator
    pub fn with_key_generator(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the identity stamped on published events
    pub fn with_instance_id<S: Into<String>>(mut self, instance_id: S) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Create the client and subscribe it to remote invalidations
    ///
    /// # Errors
    ///
    /// Returns the event provider's error if the subscription fails.
    pub async fn build(self) -> Result<QueryClient> {
        let instance_id = self
            .instance_id
            .unwrap_or_else(|| format!("revalid-{}", Uuid::new_v4()));
        let inner = Arc::new(Inner {
            cache: self.cache,
            events: self.events,
            keys: self
                .keys
                .unwrap_or_else(|| Arc::new(DefaultKeyGenerator::default())),
            clock: self.clock.unwrap_or_else(SystemClock::shared),
            instance_id,
            metadata: MetadataStore::default(),
            tracked: RwLock::new(HashMap::new()),
            refreshing: Mutex::new(HashSet::new()),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            disposed: AtomicBool::new(false),
            subscription: Mutex::new(None),
        });

        if let Some(events) = &inner.events {
            let handler = Arc::new(RemoteInvalidationHandler::new(Arc::downgrade(&inner)));
            let id = events.subscribe_to_invalidations(handler).await?;
            *inner
                .subscription
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(id);
        }

        info!(
            instance_id = %inner.instance_id,
            cache = inner.cache.provider_name(),
            events = inner.events.as_ref().map_or("none", |e| e.provider_name()),
            "Query client ready"
        );
        Ok(QueryClient { inner })
    }
}
