//! Query, Mutation and Entry Options
//!
//! Option bags passed to the query client and to cache providers. All of
//! them follow the builder style (`with_*` methods consuming `self`).

use crate::constants::{
    DEFAULT_CACHE_TIME, DEFAULT_MANUAL_ENTRY_TTL, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY,
    DEFAULT_STALE_TIME,
};
use crate::error::{Error, Result};
use crate::value_objects::{CacheEntryPriority, QueryKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Add a std duration to an instant, saturating at the representable maximum
pub fn add_duration(instant: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| instant.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Entry Storage Options
///
/// Tells a cache provider how long an entry lives, when it turns stale,
/// how important it is and which tags it belongs to.
///
/// When both an absolute expiration and a time-to-live are given, the
/// absolute expiration wins.
///
/// # Example
///
/// ```
/// use revalid_domain::value_objects::CacheEntryOptions;
/// use std::time::Duration;
///
/// let options = CacheEntryOptions::new()
///     .with_time_to_live(Duration::from_secs(600))
///     .with_stale_time(Duration::from_secs(60))
///     .with_tag("todos");
/// assert!(options.tags.contains("todos"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheEntryOptions {
    /// Fixed instant at which the entry expires
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Lifetime relative to the moment of the write
    pub time_to_live: Option<Duration>,
    /// Age after which the entry is stale but still servable
    pub stale_time: Option<Duration>,
    /// Eviction priority
    pub priority: CacheEntryPriority,
    /// Tags usable as invalidation units
    pub tags: BTreeSet<String>,
}

impl CacheEntryOptions {
    /// Options without expiry, staleness or tags
    pub fn new() -> Self {
        Self::default()
    }

    /// Options used for manually written query data (30 minute lifetime)
    pub fn manual() -> Self {
        Self::new().with_time_to_live(DEFAULT_MANUAL_ENTRY_TTL)
    }

    /// Set the time-to-live
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Set a fixed expiration instant
    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    /// Set the stale time
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Set the eviction priority
    pub fn with_priority(mut self, priority: CacheEntryPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Add a tag
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add several tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Expiry instant for an entry written at `now`
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.absolute_expiration
            .or_else(|| self.time_to_live.map(|ttl| add_duration(now, ttl)))
    }

    /// Staleness instant for an entry written at `now`, never later than the expiry
    pub fn stale_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let stale_at = self.stale_time.map(|stale| add_duration(now, stale))?;
        match self.expires_at(now) {
            Some(expires_at) if expires_at < stale_at => Some(expires_at),
            _ => Some(stale_at),
        }
    }

    /// Remaining lifetime of an entry written at `now`, if it expires
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at(now)
            .map(|at| (at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Query Options
///
/// Controls how `query` caches, refreshes and retries a fetch.
///
/// ## Business Rules
///
/// - `cache_time`, when given together with `stale_time`, must not be shorter
/// - A stale entry is served immediately and refreshed in the background
///   unless `enable_background_refetch` is off
/// - `throw_on_error = false` turns fetch failures into error results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Age after which a cached result is stale
    pub stale_time: Option<Duration>,
    /// Absolute lifetime of a cached result
    pub cache_time: Option<Duration>,
    /// Additional attempts after a failed fetch
    pub retry_count: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Refresh stale entries in the background
    pub enable_background_refetch: bool,
    /// Propagate fetch failures instead of returning an error result
    pub throw_on_error: bool,
    /// Upper bound for a single fetch attempt
    pub timeout: Option<Duration>,
    /// Tags attached to the cached entry
    pub tags: BTreeSet<String>,
    /// Eviction priority of the cached entry
    pub priority: CacheEntryPriority,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Some(DEFAULT_STALE_TIME),
            cache_time: Some(DEFAULT_CACHE_TIME),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
            enable_background_refetch: true,
            throw_on_error: true,
            timeout: None,
            tags: BTreeSet::new(),
            priority: CacheEntryPriority::Normal,
        }
    }
}

impl QueryOptions {
    /// Default query options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stale time
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    /// Set the cache time
    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = Some(cache_time);
        self
    }

    /// Set retry count and delay
    pub fn with_retry(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    /// Enable or disable background refetch of stale entries
    pub fn with_background_refetch(mut self, enabled: bool) -> Self {
        self.enable_background_refetch = enabled;
        self
    }

    /// Choose between propagating failures and returning error results
    pub fn with_throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }

    /// Bound each fetch attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a tag
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the eviction priority
    pub fn with_priority(mut self, priority: CacheEntryPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Check the option invariants
    pub fn validate(&self) -> Result<()> {
        match (self.stale_time, self.cache_time) {
            (Some(stale), Some(cache)) if cache < stale => Err(Error::invalid_argument(format!(
                "cache_time ({cache:?}) must be >= stale_time ({stale:?})"
            ))),
            _ => Ok(()),
        }
    }

    /// Entry options used to persist a fetched result
    pub fn to_entry_options(&self) -> CacheEntryOptions {
        CacheEntryOptions {
            absolute_expiration: None,
            time_to_live: self.cache_time,
            stale_time: self.stale_time,
            priority: self.priority,
            tags: self.tags.clone(),
        }
    }
}

/// Mutation Options
///
/// Keys to invalidate or refetch once a mutation succeeds, plus retry and
/// timeout controls for the mutation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOptions {
    /// Keys removed after a successful mutation
    pub invalidate_keys: Vec<QueryKey>,
    /// Keys marked for refetch after a successful mutation
    pub refetch_keys: Vec<QueryKey>,
    /// Announce invalidations to peer instances
    pub publish_event: bool,
    /// Upper bound for a single mutation attempt
    pub timeout: Option<Duration>,
    /// Additional attempts after a failed mutation
    pub retry_count: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Propagate failures of the post-success invalidation step
    pub throw_on_error: bool,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            invalidate_keys: Vec::new(),
            refetch_keys: Vec::new(),
            publish_event: true,
            timeout: None,
            retry_count: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            throw_on_error: true,
        }
    }
}

impl MutationOptions {
    /// Default mutation options
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate `key` after success
    pub fn invalidate<K: Into<QueryKey>>(mut self, key: K) -> Self {
        self.invalidate_keys.push(key.into());
        self
    }

    /// Refetch `key` after success
    pub fn refetch<K: Into<QueryKey>>(mut self, key: K) -> Self {
        self.refetch_keys.push(key.into());
        self
    }

    /// Enable or disable invalidation events
    pub fn with_publish_event(mut self, publish: bool) -> Self {
        self.publish_event = publish;
        self
    }

    /// Bound each mutation attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set retry count and delay
    pub fn with_retry(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    /// Choose whether invalidation failures propagate
    pub fn with_throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }
}

/// Produces the optimistic value written before a mutation runs
pub type OptimisticValueFn<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;
/// Transforms the mutation result before it replaces optimistic data
pub type SuccessTransformFn<T> = Box<dyn Fn(&T) -> T + Send + Sync>;
/// Observes a failed optimistic mutation
pub type ErrorCallbackFn = Box<dyn Fn(&Error) + Send + Sync>;

/// Optimistic Mutation Options
///
/// Keys written speculatively before the mutation runs, and what to do
/// with them when it succeeds or fails.
pub struct OptimisticMutationOptions<T> {
    /// Keys receiving the optimistic value (must not be empty)
    pub query_keys: Vec<QueryKey>,
    /// Optimistic value generator; `None` keeps the current cached data
    pub optimistic_value: OptimisticValueFn<T>,
    /// Transform applied to the mutation result for keys that hold data
    pub on_success: Option<SuccessTransformFn<T>>,
    /// Invalidate the keys when the mutation fails
    pub rollback_on_error: bool,
    /// Called with the failure before it is returned
    pub on_error: Option<ErrorCallbackFn>,
    /// Upper bound for the mutation
    pub timeout: Option<Duration>,
    /// How the optimistic and final values are stored
    pub entry_options: CacheEntryOptions,
}

impl<T> OptimisticMutationOptions<T> {
    /// Options for `query_keys` using `optimistic_value` as generator
    pub fn new<I, K, F>(query_keys: I, optimistic_value: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<QueryKey>,
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        Self {
            query_keys: query_keys.into_iter().map(Into::into).collect(),
            optimistic_value: Box::new(optimistic_value),
            on_success: None,
            rollback_on_error: true,
            on_error: None,
            timeout: None,
            entry_options: CacheEntryOptions::manual(),
        }
    }

    /// Transform the mutation result before storing it
    pub fn with_on_success<F>(mut self, on_success: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(on_success));
        self
    }

    /// Enable or disable rollback
    pub fn with_rollback_on_error(mut self, rollback: bool) -> Self {
        self.rollback_on_error = rollback;
        self
    }

    /// Observe failures
    pub fn with_on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Bound the mutation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Storage options for optimistic and final values
    pub fn with_entry_options(mut self, entry_options: CacheEntryOptions) -> Self {
        self.entry_options = entry_options;
        self
    }

    /// Check the option invariants
    pub fn validate(&self) -> Result<()> {
        if self.query_keys.is_empty() {
            return Err(Error::invalid_argument(
                "optimistic mutation requires at least one query key",
            ));
        }
        Ok(())
    }
}

impl<T> fmt::Debug for OptimisticMutationOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticMutationOptions")
            .field("query_keys", &self.query_keys)
            .field("has_on_success", &self.on_success.is_some())
            .field("rollback_on_error", &self.rollback_on_error)
            .field("has_on_error", &self.on_error.is_some())
            .field("timeout", &self.timeout)
            .field("entry_options", &self.entry_options)
            .finish()
    }
}
