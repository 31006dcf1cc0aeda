//! Stale-while-revalidate query behaviour

use crate::support::{client_with_clock, counting_fetch};
use revalid_domain::error::Error;
use revalid_domain::value_objects::{QueryKey, QueryOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn options() -> QueryOptions {
    QueryOptions::new()
        .with_stale_time(Duration::from_secs(1))
        .with_cache_time(Duration::from_secs(60))
        .with_retry(0, Duration::from_millis(1))
}

#[tokio::test]
async fn test_miss_fetches_once_and_caches() {
    let (client, _clock) = client_with_clock().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::from(["todos", "1"]);
    let ct = CancellationToken::new();

    let first = client
        .query(&key, counting_fetch(7u32, &calls), &options(), &ct)
        .await
        .unwrap();
    let second = client
        .query(&key, counting_fetch(8u32, &calls), &options(), &ct)
        .await
        .unwrap();

    assert!(!first.is_from_cache());
    assert_eq!(first.data(), Some(&7));
    assert!(second.is_from_cache());
    assert!(!second.is_stale());
    assert_eq!(second.data(), Some(&7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let metadata = client.get_query_metadata(&key).unwrap().unwrap();
    assert_eq!(metadata.fetch_count, 2);
    assert_eq!(metadata.cache_hit_count, 1);
    assert_eq!(metadata.network_fetch_count, 1);
}

#[tokio::test]
async fn test_stale_hit_serves_cached_data_then_refreshes() {
    let (client, clock) = client_with_clock().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::from("profile");
    let ct = CancellationToken::new();
    client
        .query(&key, counting_fetch("v1".to_string(), &calls), &options(), &ct)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(2));
    let stale = client
        .query(&key, counting_fetch("v2".to_string(), &calls), &options(), &ct)
        .await
        .unwrap();

    assert!(stale.is_from_cache());
    assert!(stale.is_stale());
    assert_eq!(stale.data().map(String::as_str), Some("v1"));

    client.wait_for_background_refreshes().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let refreshed = client
        .get_query_data::<String>(&key, &ct)
        .await
        .unwrap()
        .unwrap();
    assert!(!refreshed.is_stale());
    assert_eq!(refreshed.data().map(String::as_str), Some("v2"));

    let metadata = client.get_query_metadata(&key).unwrap().unwrap();
    assert_eq!(metadata.network_fetch_count, 2);
}

#[tokio::test]
async fn test_background_refetch_can_be_disabled() {
    let (client, clock) = client_with_clock().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::from("profile");
    let ct = CancellationToken::new();
    let opts = options().with_background_refetch(false);
    client
        .query(&key, counting_fetch(1u8, &calls), &opts, &ct)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(2));
    let stale = client
        .query(&key, counting_fetch(2u8, &calls), &opts, &ct)
        .await
        .unwrap();
    client.wait_for_background_refreshes().await;

    assert!(stale.is_stale());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_expired_entry_is_fetched_again() {
    let (client, clock) = client_with_clock().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::from("report");
    let ct = CancellationToken::new();
    client
        .query(&key, counting_fetch(1u32, &calls), &options(), &ct)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(61));
    let result = client
        .query(&key, counting_fetch(2u32, &calls), &options(), &ct)
        .await
        .unwrap();

    assert!(!result.is_from_cache());
    assert_eq!(result.data(), Some(&2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failure_without_throw_returns_error_result() {
    let (client, _clock) = client_with_clock().await;
    let key = QueryKey::from("flaky");
    let opts = options().with_throw_on_error(false);

    let result = client
        .query(
            &key,
            || async { Err::<u32, _>(Error::fetch("upstream down")) },
            &opts,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_success());
    assert!(result.data().is_none());
    assert!(result.error().is_some());
    let metadata = client.get_query_metadata(&key).unwrap().unwrap();
    assert_eq!(metadata.fetch_count, 1);
    assert!(
        metadata
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("upstream down"))
    );
}

#[tokio::test]
async fn test_failure_with_throw_propagates() {
    let (client, _clock) = client_with_clock().await;

    let err = client
        .query(
            &QueryKey::from("flaky"),
            || async { Err::<u32, _>(Error::fetch("upstream down")) },
            &options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fetch { .. }));
}

#[tokio::test]
async fn test_retries_until_fetch_succeeds() {
    let (client, _clock) = client_with_clock().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let opts = options().with_retry(2, Duration::from_millis(1));

    let result = client
        .query(
            &QueryKey::from("retry"),
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::fetch("not yet"))
                    } else {
                        Ok(42u32)
                    }
                }
            },
            &opts,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.data(), Some(&42));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_distinct_keys_fetch_once_each() {
    let (client, _clock) = client_with_clock().await;
    let mut handles = Vec::new();
    for i in 0..16u32 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let key = QueryKey::new(["item".to_string(), i.to_string()]);
            client
                .query(&key, move || async move { Ok(i) }, &options(), &CancellationToken::new())
                .await
                .map(|result| (key, result.into_data()))
        }));
    }

    for handle in handles {
        let (key, data) = handle.await.unwrap().unwrap();
        assert!(data.is_some());
        let metadata = client.get_query_metadata(&key).unwrap().unwrap();
        assert_eq!(metadata.fetch_count, 1);
    }
}

#[tokio::test]
async fn test_invalid_key_is_rejected() {
    let (client, _clock) = client_with_clock().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let err = client
        .query(
            &QueryKey::from(["users", "a:b"]),
            counting_fetch(1u32, &calls),
            &options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_invalid_key());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_token_stops_query() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    ct.cancel();

    let err = client
        .query(&QueryKey::from("k"), || async { Ok(1u32) }, &options(), &ct)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancellation_interrupts_slow_fetch() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let trigger = ct.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = client
        .query(
            &QueryKey::from("slow"),
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(1u32)
            },
            &options(),
            &ct,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(
        client
            .get_query_data::<u32>(&QueryKey::from("slow"), &CancellationToken::new())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_set_and_update_query_data() {
    let (client, _clock) = client_with_clock().await;
    let key = QueryKey::from("counter");
    let ct = CancellationToken::new();

    assert!(
        !client
            .update_query_data(&key, |n: u32| n + 1, None, &ct)
            .await
            .unwrap()
    );

    client.set_query_data(&key, &10u32, None, &ct).await.unwrap();
    assert!(
        client
            .update_query_data(&key, |n: u32| n + 1, None, &ct)
            .await
            .unwrap()
    );

    let current = client.get_query_data::<u32>(&key, &ct).await.unwrap().unwrap();
    assert_eq!(current.into_data(), Some(11));
}

#[tokio::test]
async fn test_stale_hit_does_not_wait_for_slow_refresh() {
    let (client, clock) = client_with_clock().await;
    let key = QueryKey::from("slow");
    let ct = CancellationToken::new();
    client
        .query(&key, || async { Ok(1u32) }, &options(), &ct)
        .await
        .unwrap();

    clock.advance(Duration::from_secs(2));
    let started = std::time::Instant::now();
    let stale = client
        .query(
            &key,
            || async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(2u32)
            },
            &options(),
            &ct,
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(150), "stale hit took {elapsed:?}");
    assert!(stale.is_stale());
    assert_eq!(stale.data(), Some(&1));

    client.wait_for_background_refreshes().await;
    let refreshed = client
        .query(&key, || async { Ok(3u32) }, &options(), &ct)
        .await
        .unwrap();
    assert!(refreshed.is_from_cache());
    assert_eq!(refreshed.data(), Some(&2));
}
