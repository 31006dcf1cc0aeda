//! End-to-end use through the prelude

use revalid::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn test_query_mutate_requery() {
    let client = QueryClient::builder(Arc::new(MemoryCacheProvider::new()))
        .with_events(Arc::new(TokioEventProvider::new()))
        .build()
        .await
        .unwrap();
    let ct = CancellationToken::new();
    let key = QueryKey::from(["users", "42"]);
    let fetches = Arc::new(AtomicUsize::new(0));
    let fetch = {
        let fetches = Arc::clone(&fetches);
        move || {
            let n = fetches.fetch_add(1, Ordering::SeqCst);
            async move { Ok(format!("user v{n}")) }
        }
    };

    let first = client
        .query(&key, fetch.clone(), &QueryOptions::new(), &ct)
        .await
        .unwrap();
    client
        .mutate(
            || async { Ok(()) },
            &MutationOptions::new().invalidate(["users", "42"]),
            &ct,
        )
        .await
        .unwrap();
    let second = client
        .query(&key, fetch, &QueryOptions::new(), &ct)
        .await
        .unwrap();

    assert_eq!(first.into_data().as_deref(), Some("user v0"));
    assert_eq!(second.into_data().as_deref(), Some("user v1"));
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    client.shutdown().await;
}

#[tokio::test]
async fn test_bootstrap_from_default_config() {
    let mut config = AppConfig::default();
    config.cache.provider = "memory".to_string();

    let client = build_query_client(&config).await.unwrap();

    assert!(!client.is_shutdown());
    client.shutdown().await;
    assert!(client.is_shutdown());
}
