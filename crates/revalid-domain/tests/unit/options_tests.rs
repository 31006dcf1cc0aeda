//! Unit tests for query, mutation and entry options

use chrono::Utc;
use revalid_domain::{
    CacheEntryOptions, CacheEntryPriority, MutationOptions, OptimisticMutationOptions,
    QueryOptions,
};
use std::time::Duration;

#[test]
fn test_query_options_defaults() {
    let options = QueryOptions::default();
    assert_eq!(options.stale_time, Some(Duration::from_secs(300)));
    assert_eq!(options.cache_time, Some(Duration::from_secs(1800)));
    assert_eq!(options.retry_count, 3);
    assert!(options.enable_background_refetch);
    assert!(options.throw_on_error);
    assert!(options.validate().is_ok());
}

#[test]
fn test_cache_time_shorter_than_stale_time_is_invalid() {
    let options = QueryOptions::new()
        .with_stale_time(Duration::from_secs(10))
        .with_cache_time(Duration::from_secs(5));
    assert!(options.validate().is_err());
}

#[test]
fn test_query_options_map_to_entry_options() {
    let options = QueryOptions::new()
        .with_stale_time(Duration::from_secs(1))
        .with_cache_time(Duration::from_secs(10))
        .with_tag("todos")
        .with_priority(CacheEntryPriority::High);
    let entry = options.to_entry_options();

    assert_eq!(entry.time_to_live, Some(Duration::from_secs(10)));
    assert_eq!(entry.stale_time, Some(Duration::from_secs(1)));
    assert_eq!(entry.priority, CacheEntryPriority::High);
    assert!(entry.tags.contains("todos"));
}

#[test]
fn test_absolute_expiration_wins_over_ttl() {
    let now = Utc::now();
    let at = now + chrono::Duration::seconds(5);
    let options = CacheEntryOptions::new()
        .with_time_to_live(Duration::from_secs(60))
        .with_absolute_expiration(at);
    assert_eq!(options.expires_at(now), Some(at));
}

#[test]
fn test_no_expiry_without_ttl() {
    let now = Utc::now();
    let options = CacheEntryOptions::new().with_stale_time(Duration::from_secs(5));
    assert_eq!(options.expires_at(now), None);
    assert_eq!(options.stale_at(now), Some(now + chrono::Duration::seconds(5)));
    assert_eq!(options.remaining_ttl(now), None);
}

#[test]
fn test_manual_entry_options_live_thirty_minutes() {
    let options = CacheEntryOptions::manual();
    assert_eq!(options.time_to_live, Some(Duration::from_secs(30 * 60)));
}

#[test]
fn test_mutation_options_defaults() {
    let options = MutationOptions::default();
    assert!(options.publish_event);
    assert!(options.throw_on_error);
    assert_eq!(options.retry_count, 0);
    assert!(options.invalidate_keys.is_empty());
}

#[test]
fn test_mutation_options_builder() {
    let options = MutationOptions::new()
        .invalidate(["todos"])
        .invalidate(["todos", "1"])
        .refetch(["stats"]);
    assert_eq!(options.invalidate_keys.len(), 2);
    assert_eq!(options.refetch_keys.len(), 1);
}

#[test]
fn test_optimistic_options_require_keys() {
    let empty = OptimisticMutationOptions::<u32>::new(Vec::<&str>::new(), || Some(1));
    assert!(empty.validate().is_err());

    let options = OptimisticMutationOptions::new(["todos"], || Some(1_u32));
    assert!(options.validate().is_ok());
    assert!(options.rollback_on_error);
    assert_eq!((options.optimistic_value)(), Some(1));
}
