//! Unit tests for query result factories

use chrono::Utc;
use revalid_domain::{CacheEntry, CacheEntryOptions, Error, QueryResult};
use std::time::Duration;

#[test]
fn test_from_cache_result() {
    let now = Utc::now();
    let options = CacheEntryOptions::new().with_time_to_live(Duration::from_secs(60));
    let entry = CacheEntry::from_payload("1".to_string(), &options, now);
    let result = QueryResult::from_cache(1_u32, &entry.metadata("k"), true, Duration::from_millis(2));

    assert!(result.is_success());
    assert!(result.is_from_cache());
    assert!(result.is_stale());
    assert_eq!(result.cached_at(), Some(now));
    assert_eq!(result.expires_at(), entry.expires_at);
    assert_eq!(result.etag(), entry.etag.as_deref());
    assert_eq!(result.data(), Some(&1));
}

#[test]
fn test_from_fresh_result() {
    let result = QueryResult::from_fresh("v", None, Duration::from_millis(40));
    assert!(result.is_success());
    assert!(!result.is_from_cache());
    assert!(!result.is_stale());
    assert_eq!(result.duration_ms(), 40);
    assert_eq!(result.into_data(), Some("v"));
}

#[test]
fn test_from_error_result_has_no_data() {
    let result: QueryResult<u32> =
        QueryResult::from_error(Error::fetch("backend down"), Duration::ZERO);
    assert!(!result.is_success());
    assert!(!result.is_from_cache());
    assert!(result.data().is_none());
    assert!(result.error().is_some());
    assert!(result.into_result().is_err());
}
