//! Cache contract tests against the Moka provider

use revalid_domain::ports::{CacheProvider, CacheProviderExt, ManualClock};
use revalid_domain::value_objects::CacheEntryOptions;
use revalid_providers::cache::MokaCacheProvider;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_round_trip_and_remove() {
    let cache = MokaCacheProvider::with_capacity(100);
    let options = CacheEntryOptions::new().with_time_to_live(Duration::from_secs(60));

    cache.set_typed("k", &vec![1, 2, 3], &options).await.unwrap();
    let entry = cache.get_typed::<Vec<i32>>("k").await.unwrap().unwrap();
    assert_eq!(entry.value, vec![1, 2, 3]);
    assert_eq!(entry.access_count, 1);

    assert!(cache.remove("k").await.unwrap());
    assert!(!cache.remove("k").await.unwrap());
}

#[tokio::test]
async fn test_staleness_is_reported_from_envelope() {
    let clock = ManualClock::new();
    let cache = MokaCacheProvider::with_config(100, Arc::new(clock.clone()));
    let options = CacheEntryOptions::new()
        .with_stale_time(Duration::from_secs(1))
        .with_time_to_live(Duration::from_secs(10));
    cache.set("k", "1".to_string(), &options).await.unwrap();

    clock.advance(Duration::from_secs(5));
    let metadata = cache.get_metadata("k").await.unwrap().unwrap();

    assert!(metadata.is_stale_at(revalid_domain::ports::Clock::now(&clock)));
    assert!(!metadata.is_expired_at(revalid_domain::ports::Clock::now(&clock)));
}

#[tokio::test]
async fn test_size_and_clear() {
    let cache = MokaCacheProvider::with_capacity(100);
    for i in 0..5 {
        cache
            .set(&format!("k{i}"), i.to_string(), &CacheEntryOptions::new())
            .await
            .unwrap();
    }
    assert_eq!(cache.size().await.unwrap(), 5);

    cache.clear().await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 0);
}
