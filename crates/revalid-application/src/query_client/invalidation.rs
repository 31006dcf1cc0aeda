//! Remote invalidation fan-in
//!
//! Peer instances announce removed keys and tags; each client applies them
//! to its own cache. The handler holds a weak reference so a subscription
//! left behind in the event provider never keeps a dropped client alive.

use super::Inner;
use async_trait::async_trait;
use revalid_domain::error::Result;
use revalid_domain::events::CacheInvalidationEvent;
use revalid_domain::ports::EventHandler;
use std::sync::Weak;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

pub(super) struct RemoteInvalidationHandler {
    client: Weak<Inner>,
}

impl RemoteInvalidationHandler {
    pub(super) fn new(client: Weak<Inner>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventHandler<CacheInvalidationEvent> for RemoteInvalidationHandler {
    async fn handle(&self, event: &CacheInvalidationEvent) -> Result<()> {
        if let Some(inner) = self.client.upgrade() {
            inner.apply_remote_invalidation(event).await;
        }
        Ok(())
    }
}

impl Inner {
    async fn apply_remote_invalidation(&self, event: &CacheInvalidationEvent) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if event.source_instance == self.instance_id {
            debug!(reason = %event.reason, "Skipping own invalidation event");
            return;
        }

        for key in &event.keys {
            let canonical = match self.keys.generate(key) {
                Ok(canonical) => canonical,
                Err(e) => {
                    warn!(key = %key, error = %e, "Ignoring invalid key in remote invalidation");
                    continue;
                }
            };
            if let Err(e) = self.cache.remove(&canonical).await {
                warn!(key = %canonical, error = %e, "Failed to apply remote invalidation");
            }
            self.untrack(&canonical);
        }

        for tag in &event.tags {
            if let Err(e) = self.cache.invalidate_by_tag(&self.keys.tag_key(tag)).await {
                warn!(tag = %tag, error = %e, "Failed to apply remote tag invalidation");
            }
        }

        debug!(
            source = %event.source_instance,
            reason = %event.reason,
            keys = event.keys.len(),
            tags = event.tags.len(),
            "Applied remote invalidation"
        );
    }
}
