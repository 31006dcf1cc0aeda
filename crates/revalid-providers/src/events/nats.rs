//! NATS Event Provider
//!
//! Distributed event distribution over NATS subjects. Every instance
//! connected to the same server and prefix receives every other instance's
//! events; events are JSON encoded.
//!
//! ## Subjects
//!
//! ```text
//! {prefix}.invalidated   CacheInvalidationEvent
//! {prefix}.updated       CacheUpdatedEvent
//! ```
//!
//! The connection is established on first publish or subscription.
//! Reconnection is handled by async-nats; its connect and disconnect
//! events drive [`EventProvider::connection_state_changes`].
//!
//! ## Example
//!
//! ```ignore
//! use revalid_providers::events::NatsEventProvider;
//!
//! let events = NatsEventProvider::new("nats://localhost:4222")
//!     .with_subject_prefix("orders.cache");
//! events.ensure_connected().await?;
//! ```

use super::dispatch::{ConnectionNotifier, HandlerRegistry};
use crate::constants::{
    NATS_DEFAULT_SUBJECT_PREFIX, NATS_DEFAULT_URL, NATS_INVALIDATION_SUBJECT, NATS_UPDATE_SUBJECT,
};
use async_nats::{Client, ConnectOptions, Event};
use async_trait::async_trait;
use futures::StreamExt;
use revalid_domain::error::{Error, Result};
use revalid_domain::events::{CacheInvalidationEvent, CacheUpdatedEvent};
use revalid_domain::ports::{
    ConnectionStateStream, EventHandler, EventProvider, SharedClock, SubscriptionId, SystemClock,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Event provider using NATS for distributed systems
pub struct NatsEventProvider {
    url: String,
    subject_prefix: String,
    client_name: Option<String>,
    client: OnceCell<Client>,
    invalidations: Arc<HandlerRegistry<CacheInvalidationEvent>>,
    updates: Arc<HandlerRegistry<CacheUpdatedEvent>>,
    invalidation_pump: Mutex<bool>,
    update_pump: Mutex<bool>,
    notifier: Arc<ConnectionNotifier>,
}

impl NatsEventProvider {
    /// Create a provider for the server at `url`
    ///
    /// # Arguments
    ///
    /// * `url` - NATS server URL (e.g., "nats://localhost:4222")
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self::with_clock(url, SystemClock::shared())
    }

    /// Create a provider whose state changes are stamped by `clock`
    pub fn with_clock<S: Into<String>>(url: S, clock: SharedClock) -> Self {
        Self {
            url: url.into(),
            subject_prefix: NATS_DEFAULT_SUBJECT_PREFIX.to_string(),
            client_name: None,
            client: OnceCell::new(),
            invalidations: Arc::new(HandlerRegistry::new()),
            updates: Arc::new(HandlerRegistry::new()),
            invalidation_pump: Mutex::new(false),
            update_pump: Mutex::new(false),
            notifier: Arc::new(ConnectionNotifier::new(clock, false)),
        }
    }

    /// Publish and subscribe under `prefix`
    pub fn with_subject_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Name announced to the server
    pub fn with_client_name<S: Into<String>>(mut self, name: S) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Full subject for `suffix`
    pub fn subject(&self, suffix: &str) -> String {
        format!("{}.{}", self.subject_prefix, suffix)
    }

    async fn client(&self) -> Result<Client> {
        self.client
            .get_or_try_init(|| self.connect())
            .await
            .cloned()
    }

    async fn connect(&self) -> Result<Client> {
        info!("Connecting to NATS server at {}", self.url);

        let notifier = Arc::clone(&self.notifier);
        let mut options = ConnectOptions::new().event_callback(move |event| {
            let notifier = Arc::clone(&notifier);
            async move {
                match event {
                    Event::Connected => notifier.set(true, None),
                    Event::Disconnected => notifier.set(false, None),
                    other => debug!(event = ?other, "NATS client event"),
                }
            }
        });
        if let Some(name) = &self.client_name {
            options = options.name(name);
        }

        match options.connect(self.url.as_str()).await {
            Ok(client) => {
                self.notifier.set(true, None);
                info!("Connected to NATS server at {}", self.url);
                Ok(client)
            }
            Err(e) => {
                self.notifier.set(false, Some(e.to_string()));
                Err(Error::event_connection_with_source(
                    format!("Failed to connect to NATS server at {}", self.url),
                    e,
                ))
            }
        }
    }

    async fn publish_json<E: Serialize + Sync>(&self, suffix: &str, event: &E) -> Result<()> {
        let client = self.client().await?;
        let payload = serde_json::to_vec(event)?;
        let subject = self.subject(suffix);

        client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| {
                Error::event_publish_with_source(
                    format!("Failed to publish to NATS subject '{subject}'"),
                    e,
                )
            })?;

        debug!("Published event to NATS subject '{}'", subject);
        Ok(())
    }

    /// Start forwarding messages on `suffix` to `handlers`, once
    async fn start_pump<E>(
        &self,
        suffix: &str,
        started: &Mutex<bool>,
        handlers: Arc<HandlerRegistry<E>>,
    ) -> Result<()>
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        let mut started = started.lock().await;
        if *started {
            return Ok(());
        }

        let client = self.client().await.map_err(|e| {
            Error::event_subscription_with_source("Cannot subscribe without a NATS connection", e)
        })?;
        let subject = self.subject(suffix);
        let mut subscriber = client.subscribe(subject.clone()).await.map_err(|e| {
            Error::event_subscription_with_source(
                format!("Failed to subscribe to NATS subject '{subject}'"),
                e,
            )
        })?;

        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                match serde_json::from_slice::<E>(&message.payload) {
                    Ok(event) => {
                        handlers.dispatch(&event).await;
                    }
                    Err(e) => {
                        warn!(subject = %message.subject, error = %e, "Skipping undecodable NATS message");
                    }
                }
            }
            debug!("NATS subscription closed");
        });

        *started = true;
        debug!("Subscribed to NATS subject '{}'", self.subject(suffix));
        Ok(())
    }
}

impl std::fmt::Debug for NatsEventProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEventProvider")
            .field("url", &self.url)
            .field("subject_prefix", &self.subject_prefix)
            .field("connected", &self.notifier.is_connected())
            .finish()
    }
}

#[async_trait]
impl EventProvider for NatsEventProvider {
    async fn publish_invalidation(&self, event: &CacheInvalidationEvent) -> Result<()> {
        self.publish_json(NATS_INVALIDATION_SUBJECT, event).await
    }

    async fn publish_update(&self, event: &CacheUpdatedEvent) -> Result<()> {
        self.publish_json(NATS_UPDATE_SUBJECT, event).await
    }

    async fn subscribe_to_invalidations(
        &self,
        handler: Arc<dyn EventHandler<CacheInvalidationEvent>>,
    ) -> Result<SubscriptionId> {
        self.start_pump(
            NATS_INVALIDATION_SUBJECT,
            &self.invalidation_pump,
            Arc::clone(&self.invalidations),
        )
        .await?;
        Ok(self.invalidations.register(handler))
    }

    async fn subscribe_to_updates(
        &self,
        handler: Arc<dyn EventHandler<CacheUpdatedEvent>>,
    ) -> Result<SubscriptionId> {
        self.start_pump(NATS_UPDATE_SUBJECT, &self.update_pump, Arc::clone(&self.updates))
            .await?;
        Ok(self.updates.register(handler))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        Ok(self.invalidations.remove(id) || self.updates.remove(id))
    }

    async fn is_connected(&self) -> bool {
        self.notifier.is_connected()
    }

    async fn ensure_connected(&self) -> Result<()> {
        self.client().await.map(|_| ())
    }

    fn connection_state_changes(&self) -> ConnectionStateStream {
        self.notifier.stream()
    }

    fn provider_name(&self) -> &str {
        "nats"
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{EVENT_PROVIDERS, EventProviderConfig, EventProviderEntry};

#[linkme::distributed_slice(EVENT_PROVIDERS)]
static NATS_PROVIDER: EventProviderEntry = EventProviderEntry {
    name: "nats",
    description: "NATS distributed pub/sub",
    factory: |config: &EventProviderConfig| {
        let url = config.url.as_deref().unwrap_or(NATS_DEFAULT_URL);
        let mut provider = NatsEventProvider::with_clock(url, config.clock.clone());
        if let Some(prefix) = &config.subject_prefix {
            provider = provider.with_subject_prefix(prefix.clone());
        }
        if let Some(name) = &config.client_name {
            provider = provider.with_client_name(name.clone());
        }
        Ok(Arc::new(provider))
    },
};
