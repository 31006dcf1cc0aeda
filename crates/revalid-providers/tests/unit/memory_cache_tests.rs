//! Cache contract tests against the DashMap provider

use revalid_domain::ports::{CacheProvider, CacheProviderExt, Clock, ManualClock};
use revalid_domain::value_objects::CacheEntryOptions;
use revalid_providers::cache::MemoryCacheProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Todo {
    id: u32,
    title: String,
}

fn cache_with_clock() -> (MemoryCacheProvider, ManualClock) {
    let clock = ManualClock::new();
    (MemoryCacheProvider::with_clock(Arc::new(clock.clone())), clock)
}

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let (cache, clock) = cache_with_clock();
    let todo = Todo {
        id: 1,
        title: "write tests".to_string(),
    };
    let options = CacheEntryOptions::new().with_time_to_live(Duration::from_secs(60));

    cache.set_typed("todos:1", &todo, &options).await.unwrap();
    let entry = cache.get_typed::<Todo>("todos:1").await.unwrap().unwrap();

    assert_eq!(entry.value, todo);
    assert!(!entry.is_expired_at(clock.now()));
    assert!(entry.etag.is_some());
}

#[tokio::test]
async fn test_stale_then_expired_lifecycle() {
    let (cache, clock) = cache_with_clock();
    let options = CacheEntryOptions::new()
        .with_stale_time(Duration::from_secs(1))
        .with_time_to_live(Duration::from_secs(10));
    cache.set("k", "\"v\"".to_string(), &options).await.unwrap();

    let entry = cache.get_entry("k").await.unwrap().unwrap();
    assert!(!entry.is_stale_at(clock.now()));

    clock.advance(Duration::from_secs(2));
    let entry = cache.get_entry("k").await.unwrap().unwrap();
    assert!(entry.is_stale_at(clock.now()));
    assert!(!entry.is_expired_at(clock.now()));

    clock.advance(Duration::from_secs(8));
    assert!(cache.get_entry("k").await.unwrap().is_none());
    assert!(!cache.exists("k").await.unwrap());
}

#[tokio::test]
async fn test_expired_entry_is_not_resurrected() {
    let (cache, clock) = cache_with_clock();
    let options = CacheEntryOptions::new().with_time_to_live(Duration::from_secs(5));
    cache.set("k", "1".to_string(), &options).await.unwrap();

    clock.advance(Duration::from_secs(6));
    assert!(cache.get_entry("k").await.unwrap().is_none());

    clock.set(clock.now() - chrono::Duration::seconds(10));
    assert!(cache.get_entry("k").await.unwrap().is_none());
}

#[tokio::test]
async fn test_metadata_does_not_decode_payload() {
    let (cache, _clock) = cache_with_clock();
    cache
        .set("k", "not json at all".to_string(), &CacheEntryOptions::new())
        .await
        .unwrap();

    let metadata = cache.get_metadata("k").await.unwrap().unwrap();

    assert_eq!(metadata.key, "k");
    assert_eq!(metadata.size_bytes, "not json at all".len() as u64);
    assert!(cache.get_typed::<u32>("k").await.is_err());
}

#[tokio::test]
async fn test_bulk_operations() {
    let (cache, _clock) = cache_with_clock();
    let options = CacheEntryOptions::new();
    cache
        .set_bulk(
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ],
            &options,
        )
        .await
        .unwrap();

    let keys = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
    let found = cache.get_bulk(&keys).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["b"].value, "2");

    let removed = cache.remove_bulk(&keys).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(cache.size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalidate_by_tag_only_removes_tagged() {
    let (cache, _clock) = cache_with_clock();
    let tagged = CacheEntryOptions::new().with_tag("tag:users");
    cache.set("users:1", "1".to_string(), &tagged).await.unwrap();
    cache.set("users:2", "2".to_string(), &tagged).await.unwrap();
    cache
        .set("posts:1", "3".to_string(), &CacheEntryOptions::new())
        .await
        .unwrap();

    assert_eq!(cache.invalidate_by_tag("tag:users").await.unwrap(), 2);
    assert_eq!(cache.size().await.unwrap(), 1);
    assert!(cache.exists("posts:1").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_sets_leave_one_written_value() {
    let (cache, _clock) = cache_with_clock();
    let cache = Arc::new(cache);

    let writers: Vec<_> = (0..16)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .set_typed("k", &i, &CacheEntryOptions::new())
                    .await
                    .unwrap();
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let value = cache.get_typed::<i32>("k").await.unwrap().unwrap().value;
    assert!((0..16).contains(&value));
}

#[tokio::test]
async fn test_clear() {
    let (cache, _clock) = cache_with_clock();
    cache
        .set("a", "1".to_string(), &CacheEntryOptions::new())
        .await
        .unwrap();

    cache.clear().await.unwrap();

    assert_eq!(cache.size().await.unwrap(), 0);
    assert_eq!(cache.provider_name(), "memory");
}
