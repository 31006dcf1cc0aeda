//! Unit tests for cache entry lifecycle

use chrono::Utc;
use revalid_domain::{CacheEntry, CacheEntryOptions, CacheEntryPriority};
use std::time::Duration;

fn entry_with(stale: u64, ttl: u64) -> (CacheEntry<String>, chrono::DateTime<Utc>) {
    let now = Utc::now();
    let options = CacheEntryOptions::new()
        .with_stale_time(Duration::from_secs(stale))
        .with_time_to_live(Duration::from_secs(ttl));
    (CacheEntry::from_payload("\"v\"".to_string(), &options, now), now)
}

#[test]
fn test_fresh_then_stale_then_expired() {
    let (entry, now) = entry_with(1, 10);

    assert!(!entry.is_stale_at(now));
    assert!(entry.is_valid_at(now));

    let later = now + chrono::Duration::milliseconds(1500);
    assert!(entry.is_stale_at(later));
    assert!(!entry.is_expired_at(later));

    let expired = now + chrono::Duration::seconds(10);
    assert!(entry.is_expired_at(expired));
    assert!(!entry.is_valid_at(expired));
}

#[test]
fn test_entry_without_times_never_stales_or_expires() {
    let now = Utc::now();
    let entry = CacheEntry::from_payload("1".to_string(), &CacheEntryOptions::new(), now);
    let far = now + chrono::Duration::days(365);
    assert!(!entry.is_stale_at(far));
    assert!(!entry.is_expired_at(far));
}

#[test]
fn test_record_access_updates_counters() {
    let (mut entry, now) = entry_with(1, 10);
    let later = now + chrono::Duration::seconds(3);
    entry.record_access(later);
    entry.record_access(later);

    assert_eq!(entry.access_count, 2);
    assert_eq!(entry.last_accessed, later);
    assert_eq!(entry.created_at, now);
}

#[test]
fn test_metadata_mirrors_envelope() {
    let now = Utc::now();
    let options = CacheEntryOptions::new()
        .with_priority(CacheEntryPriority::NeverRemove)
        .with_tag("a");
    let entry = CacheEntry::from_payload("\"hello\"".to_string(), &options, now);
    let metadata = entry.metadata("k");

    assert_eq!(metadata.key, "k");
    assert_eq!(metadata.size_bytes, 7);
    assert_eq!(metadata.priority, CacheEntryPriority::NeverRemove);
    assert!(metadata.tags.contains("a"));
    assert_eq!(metadata.etag, entry.etag);
}

#[test]
fn test_decode_rejects_mismatched_payload() {
    let (entry, _) = entry_with(1, 10);
    assert!(entry.decode::<u64>().is_err());
}

#[test]
fn test_entry_round_trips_through_json() {
    let (entry, _) = entry_with(1, 10);
    let json = serde_json::to_string(&entry).expect("serialization should succeed");
    let back: CacheEntry<String> =
        serde_json::from_str(&json).expect("deserialization should succeed");
    assert_eq!(entry, back);
}
