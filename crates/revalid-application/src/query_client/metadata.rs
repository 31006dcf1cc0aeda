//! Per-key query statistics store
//!
//! One map from canonical key to a per-entry mutex. The map lock is only
//! held to find or create an entry; counters are updated under the entry
//! lock, so concurrent queries on different keys never contend and
//! concurrent queries on the same key never lose an increment.

use chrono::{DateTime, Utc};
use revalid_domain::entities::QueryMetadata;
use revalid_domain::value_objects::QueryKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Debug, Default)]
pub(crate) struct MetadataStore {
    entries: RwLock<HashMap<String, Arc<Mutex<QueryMetadata>>>>,
}

impl MetadataStore {
    /// Apply `update` to the statistics of `canonical`, creating them first if needed
    pub(crate) fn update<F>(&self, canonical: &str, key: &QueryKey, now: DateTime<Utc>, update: F)
    where
        F: FnOnce(&mut QueryMetadata),
    {
        let slot = self.slot(canonical, key, now);
        let mut metadata = slot.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut metadata);
    }

    /// Snapshot of the statistics of `canonical`
    pub(crate) fn get(&self, canonical: &str) -> Option<QueryMetadata> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(canonical)
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Drop every entry in one step
    pub(crate) fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn slot(&self, canonical: &str, key: &QueryKey, now: DateTime<Utc>) -> Arc<Mutex<QueryMetadata>> {
        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(canonical)
        {
            return Arc::clone(slot);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            entries
                .entry(canonical.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(QueryMetadata::new(key.clone(), now)))),
        )
    }
}
