//! Cache Events
//!
//! Notifications exchanged between query client instances through an
//! event provider. Keys travel as segment lists so that every receiver
//! canonicalizes them with its own key generator.

use crate::value_objects::QueryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why cache entries were invalidated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// Invalidated by user code (mutations, explicit invalidation)
    Manual,
    /// Entry reached its expiry
    Expired,
    /// A dependency changed
    Dependency,
    /// Removed by an eviction policy
    Eviction,
    /// Stored data could not be read back
    Corruption,
    /// Tag-based invalidation
    Tag,
    /// Invalidated so that the next read refetches
    Refresh,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Manual => "manual",
            Self::Expired => "expired",
            Self::Dependency => "dependency",
            Self::Eviction => "eviction",
            Self::Corruption => "corruption",
            Self::Tag => "tag",
            Self::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Event: Cache Entries Invalidated
///
/// Receivers remove every listed key, and apply every listed tag through
/// their cache provider's tag invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidationEvent {
    /// Invalidated keys
    pub keys: Vec<QueryKey>,
    /// Why the keys were invalidated
    pub reason: InvalidationReason,
    /// Identity of the instance that invalidated them
    pub source_instance: String,
    /// When the invalidation happened
    pub timestamp: DateTime<Utc>,
    /// Invalidated tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CacheInvalidationEvent {
    /// Invalidation of `keys`
    pub fn new<S: Into<String>>(
        keys: Vec<QueryKey>,
        reason: InvalidationReason,
        source_instance: S,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            keys,
            reason,
            source_instance: source_instance.into(),
            timestamp,
            tags: Vec::new(),
        }
    }

    /// Invalidation of a single key
    pub fn for_key<S: Into<String>>(
        key: QueryKey,
        reason: InvalidationReason,
        source_instance: S,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(vec![key], reason, source_instance, timestamp)
    }

    /// Invalidation of a tag
    pub fn for_tag<T: Into<String>, S: Into<String>>(
        tag: T,
        source_instance: S,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(Vec::new(), InvalidationReason::Tag, source_instance, timestamp)
            .with_tags([tag])
    }

    /// Attach tags
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Event: Cache Entries Written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheUpdatedEvent {
    /// Updated keys
    pub keys: Vec<QueryKey>,
    /// Identity of the instance that wrote them
    pub source_instance: String,
    /// When the write happened
    pub timestamp: DateTime<Utc>,
    /// Approximate size of the written payload
    pub data_size_bytes: u64,
    /// Whether the write came from a background refresh
    pub is_background_refresh: bool,
}

impl CacheUpdatedEvent {
    /// Update of a single key
    pub fn for_key<S: Into<String>>(
        key: QueryKey,
        source_instance: S,
        timestamp: DateTime<Utc>,
        data_size_bytes: u64,
        is_background_refresh: bool,
    ) -> Self {
        Self {
            keys: vec![key],
            source_instance: source_instance.into(),
            timestamp,
            data_size_bytes,
            is_background_refresh,
        }
    }
}

/// Event: Transport Connection State Changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStateChange {
    /// New state
    pub is_connected: bool,
    /// Previous state
    pub was_connected: bool,
    /// Failure that caused the change, if any
    pub error: Option<String>,
    /// When the state changed
    pub timestamp: DateTime<Utc>,
}

impl ConnectionStateChange {
    /// Transition from `was_connected` to `is_connected`
    pub fn new(was_connected: bool, is_connected: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_connected,
            was_connected,
            error: None,
            timestamp,
        }
    }

    /// Attach the triggering failure
    pub fn with_error<S: Into<String>>(mut self, error: S) -> Self {
        self.error = Some(error.into());
        self
    }
}
