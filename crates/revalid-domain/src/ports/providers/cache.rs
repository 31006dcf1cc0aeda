//! Cache Provider Port
//!
//! Port for cache backends. Supports in-memory (DashMap, Moka), distributed
//! (Redis) and null providers behind the same contract.
//!
//! ## Payload Model
//!
//! Providers store `CacheEntry<String>`: the value is the JSON encoding of
//! the caller's type, so the port stays object-safe. Typed access goes
//! through [`CacheProviderExt`].

use crate::entities::{CacheEntry, CacheEntryMetadata};
use crate::error::Result;
use crate::value_objects::CacheEntryOptions;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::warn;

/// Cache Provider Port
///
/// Defines the contract for cache backends. Keys are canonical strings
/// produced by a [`KeyGenerator`](crate::ports::KeyGenerator).
///
/// ## Contract
///
/// - `get_entry` on an expired entry returns `None` exactly like a miss and
///   never resurrects it
/// - `set` replaces atomically; concurrent writers leave one of the written
///   values, never a merge
/// - `remove_bulk` and `invalidate_by_tag` are best-effort per key
///
/// # Implementations
///
/// - **Memory**: DashMap store with lazy expiry
/// - **Moka**: bounded in-memory cache
/// - **Redis**: distributed cache for multi-instance deployments
/// - **Null**: no-op provider for testing
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug {
    /// Get an entry and record the access
    ///
    /// # Returns
    /// The entry if present and not expired
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>>;

    /// Store a JSON payload, replacing any existing entry
    async fn set(&self, key: &str, payload: String, options: &CacheEntryOptions) -> Result<()>;

    /// Check if a live entry exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Get the envelope of a live entry without decoding its payload
    async fn get_metadata(&self, key: &str) -> Result<Option<CacheEntryMetadata>>;

    /// Remove an entry
    ///
    /// # Returns
    /// True if the key was removed, false if it didn't exist
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Get several live entries, keyed by cache key
    async fn get_bulk(&self, keys: &[String]) -> Result<HashMap<String, CacheEntry<String>>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get_entry(key).await? {
                found.insert(key.clone(), entry);
            }
        }
        Ok(found)
    }

    /// Store several payloads with the same options
    async fn set_bulk(&self, entries: Vec<(String, String)>, options: &CacheEntryOptions) -> Result<()> {
        for (key, payload) in entries {
            self.set(&key, payload, options).await?;
        }
        Ok(())
    }

    /// Remove several keys, continuing past individual failures
    ///
    /// # Returns
    /// Number of keys that were removed
    async fn remove_bulk(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            match self.remove(key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "Failed to remove cache key"),
            }
        }
        Ok(removed)
    }

    /// Remove every entry carrying `tag`
    ///
    /// # Returns
    /// Number of entries removed
    async fn invalidate_by_tag(&self, tag: &str) -> Result<usize>;

    /// Remove all entries
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries
    async fn size(&self) -> Result<usize>;

    /// Provider identifier (e.g., "memory", "moka", "redis", "null")
    fn provider_name(&self) -> &str;
}

/// Typed access on top of the JSON payload port
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Get and decode an entry
    async fn get_typed<T>(&self, key: &str) -> Result<Option<CacheEntry<T>>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_entry(key).await? {
            Some(entry) => Ok(Some(entry.decode()?)),
            None => Ok(None),
        }
    }

    /// Encode and store a value
    async fn set_typed<T>(&self, key: &str, value: &T, options: &CacheEntryOptions) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let payload = serde_json::to_string(value)?;
        self.set(key, payload, options).await
    }
}

impl<P: CacheProvider + ?Sized> CacheProviderExt for P {}
