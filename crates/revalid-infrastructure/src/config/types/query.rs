//! Default query behaviour

use revalid_domain::constants::{
    DEFAULT_CACHE_TIME, DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY, DEFAULT_STALE_TIME,
};
use revalid_domain::value_objects::QueryOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Query defaults applied by [`QueryConfig::to_query_options`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Seconds before a cached result is stale
    pub stale_time_secs: u64,

    /// Seconds a cached result lives
    pub cache_time_secs: u64,

    /// Additional attempts after a failed fetch
    pub retry_count: u32,

    /// Milliseconds between attempts
    pub retry_delay_ms: u64,

    /// Refresh stale entries in the background
    pub enable_background_refetch: bool,

    /// Propagate fetch failures instead of returning error results
    pub throw_on_error: bool,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: DEFAULT_STALE_TIME.as_secs(),
            cache_time_secs: DEFAULT_CACHE_TIME.as_secs(),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay_ms: u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX),
            enable_background_refetch: true,
            throw_on_error: true,
            timeout_ms: None,
        }
    }
}

impl QueryConfig {
    /// Query options carrying these defaults
    pub fn to_query_options(&self) -> QueryOptions {
        let mut options = QueryOptions::new()
            .with_stale_time(Duration::from_secs(self.stale_time_secs))
            .with_cache_time(Duration::from_secs(self.cache_time_secs))
            .with_retry(self.retry_count, Duration::from_millis(self.retry_delay_ms))
            .with_background_refetch(self.enable_background_refetch)
            .with_throw_on_error(self.throw_on_error);
        if let Some(timeout) = self.timeout_ms {
            options = options.with_timeout(Duration::from_millis(timeout));
        }
        options
    }
}
