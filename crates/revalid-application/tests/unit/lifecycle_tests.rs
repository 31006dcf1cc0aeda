//! Client lifecycle: key tracking, reset and shutdown

use crate::support::{client_with_clock, counting_fetch};
use revalid_application::QueryClient;
use revalid_application::registry::{CacheProviderConfig, resolve_cache_provider};
use revalid_domain::value_objects::{CacheEntryOptions, QueryKey, QueryOptions};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_active_keys_are_sorted_and_pruned() {
    let (client, clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let short = CacheEntryOptions::new().with_time_to_live(Duration::from_secs(5));
    client
        .set_query_data(&QueryKey::from("b"), &1u32, None, &ct)
        .await
        .unwrap();
    client
        .set_query_data(&QueryKey::from("a"), &1u32, None, &ct)
        .await
        .unwrap();
    client
        .set_query_data(&QueryKey::from("c"), &1u32, Some(short), &ct)
        .await
        .unwrap();

    let keys = client.list_active_keys(&ct).await.unwrap();
    assert_eq!(
        keys,
        vec![QueryKey::from("a"), QueryKey::from("b"), QueryKey::from("c")]
    );

    clock.advance(Duration::from_secs(10));
    let keys = client.list_active_keys(&ct).await.unwrap();
    assert_eq!(keys, vec![QueryKey::from("a"), QueryKey::from("b")]);
}

#[tokio::test]
async fn test_reset_clears_data_and_metadata() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let key = QueryKey::from("k");
    let calls = Arc::new(AtomicUsize::new(0));
    client
        .query(&key, counting_fetch(1u32, &calls), &QueryOptions::new(), &ct)
        .await
        .unwrap();
    assert!(client.get_query_metadata(&key).unwrap().is_some());

    client.reset(&ct).await.unwrap();

    assert!(client.get_query_metadata(&key).unwrap().is_none());
    assert!(client.get_query_data::<u32>(&key, &ct).await.unwrap().is_none());
    assert!(client.list_active_keys(&ct).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_disposes_client() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();

    client.shutdown().await;
    client.shutdown().await;

    assert!(client.is_shutdown());
    let err = client
        .get_query_data::<u32>(&QueryKey::from("k"), &ct)
        .await
        .unwrap_err();
    assert!(err.is_disposed());
    assert!(
        client
            .get_query_metadata(&QueryKey::from("k"))
            .unwrap_err()
            .is_disposed()
    );
}

#[tokio::test]
async fn test_shutdown_stops_background_refresh() {
    let (client, clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let key = QueryKey::from("slow");
    let options = QueryOptions::new()
        .with_stale_time(Duration::from_secs(1))
        .with_cache_time(Duration::from_secs(60));
    let calls = Arc::new(AtomicUsize::new(0));
    client
        .query(&key, counting_fetch(1u32, &calls), &options, &ct)
        .await
        .unwrap();
    clock.advance(Duration::from_secs(2));

    client
        .query(
            &key,
            || async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(2u32)
            },
            &options,
            &ct,
        )
        .await
        .unwrap();
    assert_eq!(client.pending_background_refreshes(), 1);

    tokio::time::timeout(Duration::from_secs(2), client.shutdown())
        .await
        .unwrap();
    assert_eq!(client.pending_background_refreshes(), 0);
}

#[tokio::test]
async fn test_builder_defaults_and_registry_cache() {
    let cache = resolve_cache_provider(&CacheProviderConfig::new("moka")).unwrap();

    let client = QueryClient::builder(cache).build().await.unwrap();

    assert!(client.instance_id().starts_with("revalid-"));
    assert!(!client.is_shutdown());
}

#[tokio::test]
async fn test_explicit_instance_id() {
    let cache = resolve_cache_provider(&CacheProviderConfig::new("memory")).unwrap();

    let client = QueryClient::builder(cache)
        .with_instance_id("api-1")
        .build()
        .await
        .unwrap();

    assert_eq!(client.instance_id(), "api-1");
}
