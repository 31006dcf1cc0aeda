//! Query Result
//!
//! Outcome of a query: the data and where it came from, or the failure.

use crate::entities::CacheEntryMetadata;
use crate::error::Error;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Value Object: Query Outcome
///
/// Built through exactly one of [`QueryResult::from_cache`],
/// [`QueryResult::from_fresh`] or [`QueryResult::from_error`]. Error
/// results never carry data and are never successful.
#[derive(Debug)]
pub struct QueryResult<T> {
    data: Option<T>,
    is_success: bool,
    is_stale: bool,
    is_from_cache: bool,
    cached_at: Option<DateTime<Utc>>,
    stale_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    error: Option<Error>,
    duration: Duration,
    etag: Option<String>,
}

impl<T> QueryResult<T> {
    /// Data served from a cached entry
    pub fn from_cache(
        data: T,
        entry: &CacheEntryMetadata,
        is_stale: bool,
        duration: Duration,
    ) -> Self {
        Self {
            data: Some(data),
            is_success: true,
            is_stale,
            is_from_cache: true,
            cached_at: Some(entry.created_at),
            stale_at: entry.stale_at,
            expires_at: entry.expires_at,
            error: None,
            duration,
            etag: entry.etag.clone(),
        }
    }

    /// Data produced by running the fetch function
    ///
    /// `entry` describes the entry written for the data, when one was.
    pub fn from_fresh(data: T, entry: Option<&CacheEntryMetadata>, duration: Duration) -> Self {
        Self {
            data: Some(data),
            is_success: true,
            is_stale: false,
            is_from_cache: false,
            cached_at: entry.map(|e| e.created_at),
            stale_at: entry.and_then(|e| e.stale_at),
            expires_at: entry.and_then(|e| e.expires_at),
            error: None,
            duration,
            etag: entry.and_then(|e| e.etag.clone()),
        }
    }

    /// A failed query
    pub fn from_error(error: Error, duration: Duration) -> Self {
        Self {
            data: None,
            is_success: false,
            is_stale: false,
            is_from_cache: false,
            cached_at: None,
            stale_at: None,
            expires_at: None,
            error: Some(error),
            duration,
            etag: None,
        }
    }

    /// The data, absent for error results
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the result and return the data
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Consume the result, turning an error result into `Err`
    pub fn into_result(self) -> crate::error::Result<T> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(Error::invalid_operation("query result holds no data")),
        }
    }

    /// Whether the query succeeded
    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// Whether cached data was served past its stale time
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    /// Whether the data came from the cache
    pub fn is_from_cache(&self) -> bool {
        self.is_from_cache
    }

    /// When the served entry was written
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.cached_at
    }

    /// When the data becomes stale
    pub fn stale_at(&self) -> Option<DateTime<Utc>> {
        self.stale_at
    }

    /// When the data expires
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The failure, for error results
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// How long the query took
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// How long the query took, in whole milliseconds
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Content hash of the cached payload
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }
}
