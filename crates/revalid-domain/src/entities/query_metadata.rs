//! Query Metadata Entity
//!
//! Per-key statistics kept by the query client: how often a key was
//! queried, how often the cache answered, how long fetches take and the
//! last failure.

use crate::value_objects::QueryKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Entity: Per-Key Query Statistics
///
/// ## Business Rules
///
/// - `fetch_count` counts every foreground query attempt, hit or miss
/// - `average_fetch_duration_ms` only includes fetches that ran the fetch
///   function (foreground misses and background refreshes)
/// - `cache_hit_ratio` is 0 until the first attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// The query key
    pub key: QueryKey,
    /// First query for the key
    pub created_at: DateTime<Utc>,
    /// Last query attempt or refresh
    pub last_fetched: DateTime<Utc>,
    /// When the cached data becomes stale
    pub stale_at: Option<DateTime<Utc>>,
    /// When the cached data expires
    pub expires_at: Option<DateTime<Utc>>,
    /// Foreground query attempts
    pub fetch_count: u64,
    /// Attempts answered from cache
    pub cache_hit_count: u64,
    /// Fetch function executions included in the running average
    pub network_fetch_count: u64,
    /// Running mean of fetch durations
    pub average_fetch_duration_ms: f64,
    /// Message of the last failure
    pub last_error: Option<String>,
    /// When the last failure happened
    pub last_error_at: Option<DateTime<Utc>>,
}

impl QueryMetadata {
    /// Empty statistics for `key`
    pub fn new(key: QueryKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            created_at: now,
            last_fetched: now,
            stale_at: None,
            expires_at: None,
            fetch_count: 0,
            cache_hit_count: 0,
            network_fetch_count: 0,
            average_fetch_duration_ms: 0.0,
            last_error: None,
            last_error_at: None,
        }
    }

    /// Hits divided by attempts
    pub fn cache_hit_ratio(&self) -> f64 {
        if self.fetch_count == 0 {
            0.0
        } else {
            self.cache_hit_count as f64 / self.fetch_count as f64
        }
    }

    /// Whether the cached data is stale at `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.stale_at.is_some_and(|at| now >= at)
    }

    /// Whether the cached data is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// A query answered from cache
    pub fn record_cache_hit(
        &mut self,
        now: DateTime<Utc>,
        stale_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.fetch_count += 1;
        self.cache_hit_count += 1;
        self.last_fetched = now;
        self.stale_at = stale_at;
        self.expires_at = expires_at;
    }

    /// A query that ran the fetch function in the foreground
    pub fn record_fetch(
        &mut self,
        now: DateTime<Utc>,
        duration: Duration,
        stale_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.fetch_count += 1;
        self.record_refresh(now, duration, stale_at, expires_at);
    }

    /// A background refresh that completed
    pub fn record_refresh(
        &mut self,
        now: DateTime<Utc>,
        duration: Duration,
        stale_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.network_fetch_count += 1;
        let n = self.network_fetch_count as f64;
        let sample = duration.as_secs_f64() * 1000.0;
        self.average_fetch_duration_ms = (self.average_fetch_duration_ms * (n - 1.0) + sample) / n;
        self.last_fetched = now;
        self.stale_at = stale_at;
        self.expires_at = expires_at;
    }

    /// A foreground query attempt that failed
    pub fn record_failed_fetch(&mut self, now: DateTime<Utc>, error: &str) {
        self.fetch_count += 1;
        self.last_fetched = now;
        self.record_error(now, error);
    }

    /// A failure that is not a query attempt (background refresh)
    pub fn record_error(&mut self, now: DateTime<Utc>, error: &str) {
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(now);
    }
}
