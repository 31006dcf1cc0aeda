//! Cache Entry Entity
//!
//! A cached value together with its temporal state (created, accessed,
//! stale, expired) and usage counters. Staleness and expiry are evaluated
//! against an explicit `now` so that callers decide which clock applies.

use crate::error::Result;
use crate::value_objects::{CacheEntryOptions, CacheEntryPriority};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Entity: Cached Value With Lifecycle State
///
/// Providers store `CacheEntry<String>` whose value is the JSON payload of
/// the caller's type; [`CacheEntry::decode`] turns it into a typed entry.
///
/// ## Business Rules
///
/// - `stale_at <= expires_at` whenever both are set
/// - An expired entry is never served and behaves as a miss
/// - `last_accessed` and `access_count` change on every successful read
///
/// ## Example
///
/// ```
/// use revalid_domain::entities::CacheEntry;
/// use revalid_domain::value_objects::CacheEntryOptions;
/// use chrono::Utc;
/// use std::time::Duration;
///
/// let now = Utc::now();
/// let options = CacheEntryOptions::new()
///     .with_stale_time(Duration::from_secs(1))
///     .with_time_to_live(Duration::from_secs(10));
/// let entry = CacheEntry::from_payload("42".to_string(), &options, now);
///
/// assert!(!entry.is_stale_at(now));
/// assert!(entry.is_stale_at(now + chrono::Duration::seconds(2)));
/// assert!(entry.is_expired_at(now + chrono::Duration::seconds(10)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// When the entry was last read
    pub last_accessed: DateTime<Utc>,
    /// When the entry becomes eligible for background refresh
    pub stale_at: Option<DateTime<Utc>>,
    /// When the entry stops being servable
    pub expires_at: Option<DateTime<Utc>>,
    /// Content hash of the stored payload
    pub etag: Option<String>,
    /// Invalidation tags
    pub tags: BTreeSet<String>,
    /// Number of successful reads
    pub access_count: u64,
    /// Approximate payload size
    pub size_bytes: u64,
    /// Eviction priority
    pub priority: CacheEntryPriority,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is stale at `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.stale_at.is_some_and(|at| now >= at)
    }

    /// Whether the entry is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether the entry is servable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }

    /// Record a successful read
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Envelope without the value
    pub fn metadata(&self, key: &str) -> CacheEntryMetadata {
        CacheEntryMetadata {
            key: key.to_string(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
            stale_at: self.stale_at,
            expires_at: self.expires_at,
            etag: self.etag.clone(),
            tags: self.tags.clone(),
            access_count: self.access_count,
            size_bytes: self.size_bytes,
            priority: self.priority,
        }
    }

    /// Replace the value, keeping the envelope
    pub fn map<U, F>(self, f: F) -> CacheEntry<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheEntry {
            value: f(self.value),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
            stale_at: self.stale_at,
            expires_at: self.expires_at,
            etag: self.etag,
            tags: self.tags,
            access_count: self.access_count,
            size_bytes: self.size_bytes,
            priority: self.priority,
        }
    }
}

impl CacheEntry<String> {
    /// Build a fresh entry for a JSON payload written at `now`
    pub fn from_payload(payload: String, options: &CacheEntryOptions, now: DateTime<Utc>) -> Self {
        let size_bytes = payload.len() as u64;
        let etag = payload_etag(&payload);
        Self {
            value: payload,
            created_at: now,
            last_accessed: now,
            stale_at: options.stale_at(now),
            expires_at: options.expires_at(now),
            etag: Some(etag),
            tags: options.tags.clone(),
            access_count: 0,
            size_bytes,
            priority: options.priority,
        }
    }

    /// Deserialize the payload into a typed entry
    pub fn decode<T: DeserializeOwned>(&self) -> Result<CacheEntry<T>> {
        let value = serde_json::from_str(&self.value)?;
        Ok(self.clone().map(|_| value))
    }
}

/// Hex content hash used as entry ETag
pub fn payload_etag(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    hex::encode(&digest[..16])
}

/// Value Object: Cache Entry Envelope
///
/// Everything a provider knows about an entry except its value. Reading it
/// never requires deserializing the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryMetadata {
    /// Canonical cache key
    pub key: String,
    /// When the entry was written
    pub created_at: DateTime<Utc>,
    /// When the entry was last read
    pub last_accessed: DateTime<Utc>,
    /// When the entry becomes stale
    pub stale_at: Option<DateTime<Utc>>,
    /// When the entry expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Content hash of the stored payload
    pub etag: Option<String>,
    /// Invalidation tags
    pub tags: BTreeSet<String>,
    /// Number of successful reads
    pub access_count: u64,
    /// Approximate payload size
    pub size_bytes: u64,
    /// Eviction priority
    pub priority: CacheEntryPriority,
}

impl CacheEntryMetadata {
    /// Whether the entry is stale at `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.stale_at.is_some_and(|at| now >= at)
    }

    /// Whether the entry is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
