//! Handler fan-out and connection state notification shared by providers

use crate::constants::CONNECTION_STATE_CAPACITY;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::join_all;
use futures::stream;
use revalid_domain::events::ConnectionStateChange;
use revalid_domain::ports::{ConnectionStateStream, EventHandler, SharedClock, SubscriptionId};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Registered handlers for one kind of event
pub struct HandlerRegistry<E> {
    handlers: DashMap<SubscriptionId, Arc<dyn EventHandler<E>>>,
}

impl<E> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}

impl<E> std::fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<E: Send + Sync> HandlerRegistry<E> {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler
    pub fn register(&self, handler: Arc<dyn EventHandler<E>>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.handlers.insert(id, handler);
        id
    }

    /// Remove a handler
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver `event` to every handler concurrently
    ///
    /// # Returns
    /// Number of handlers that failed or panicked
    pub async fn dispatch(&self, event: &E) -> usize {
        let handlers: Vec<(SubscriptionId, Arc<dyn EventHandler<E>>)> = self
            .handlers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let outcomes = join_all(handlers.iter().map(|(id, handler)| async move {
            let outcome = AssertUnwindSafe(handler.handle(event)).catch_unwind().await;
            (*id, outcome)
        }))
        .await;

        let mut failures = 0;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(subscription = %id, error = %e, "Event handler failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(subscription = %id, "Event handler panicked");
                }
            }
        }
        debug!(handlers = handlers.len(), failures, "Event dispatched");
        failures
    }
}

/// Forward every event received on `receiver` to `handlers`
///
/// Runs until the sending side is dropped. Lagging is logged and skipped.
pub fn pump_broadcast<E>(mut receiver: broadcast::Receiver<E>, handlers: Arc<HandlerRegistry<E>>)
where
    E: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    handlers.dispatch(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event stream lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Tracks connection state and broadcasts its transitions
#[derive(Debug)]
pub struct ConnectionNotifier {
    connected: AtomicBool,
    sender: broadcast::Sender<ConnectionStateChange>,
    clock: SharedClock,
}

impl ConnectionNotifier {
    /// Notifier starting in the given state
    pub fn new(clock: SharedClock, connected: bool) -> Self {
        let (sender, _) = broadcast::channel(CONNECTION_STATE_CAPACITY);
        Self {
            connected: AtomicBool::new(connected),
            sender,
            clock,
        }
    }

    /// Current state
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Record the current state
    ///
    /// A notification goes out when the state changes or an error is given.
    pub fn set(&self, connected: bool, error: Option<String>) {
        let was_connected = self.connected.swap(connected, Ordering::SeqCst);
        if was_connected == connected && error.is_none() {
            return;
        }
        let mut change = ConnectionStateChange::new(was_connected, connected, self.clock.now());
        if let Some(error) = error {
            change = change.with_error(error);
        }
        // No receivers is fine
        let _ = self.sender.send(change);
    }

    /// Stream of transitions recorded from now on
    pub fn stream(&self) -> ConnectionStateStream {
        let receiver = self.sender.subscribe();
        let stream = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(change) => return Some((change, rx)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Connection state stream lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Box::pin(stream)
    }
}
