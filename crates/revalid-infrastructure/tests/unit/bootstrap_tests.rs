//! Building a query client from configuration

use revalid_domain::ports::ManualClock;
use revalid_domain::value_objects::QueryKey;
use revalid_infrastructure::bootstrap::{build_query_client, build_query_client_with_clock};
use revalid_infrastructure::config::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn memory_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.cache.provider = "memory".to_string();
    config
}

#[tokio::test]
async fn test_configured_client_serves_queries() {
    let mut config = memory_config();
    config.instance_id = Some("api-1".to_string());
    config.query.stale_time_secs = 1;
    config.query.cache_time_secs = 5;
    let clock = ManualClock::new();

    let client = build_query_client_with_clock(&config, Arc::new(clock.clone()))
        .await
        .unwrap();
    let options = config.query.to_query_options();
    let key = QueryKey::from(["users", "1"]);
    let ct = CancellationToken::new();
    client
        .query(&key, || async { Ok(1u32) }, &options, &ct)
        .await
        .unwrap();
    clock.advance(Duration::from_secs(6));
    let refetched = client
        .query(&key, || async { Ok(2u32) }, &options, &ct)
        .await
        .unwrap();

    assert_eq!(client.instance_id(), "api-1");
    assert!(!refetched.is_from_cache());
    assert_eq!(refetched.into_data(), Some(2));
    client.shutdown().await;
}

#[tokio::test]
async fn test_generated_instance_id() {
    let mut config = memory_config();
    config.events.enabled = false;

    let client = build_query_client(&config).await.unwrap();

    assert!(!client.instance_id().is_empty());
    assert!(!client.instance_id().starts_with("revalid-"));
}

#[tokio::test]
async fn test_custom_separator_applies_to_keys() {
    let mut config = memory_config();
    config.keys.separator = "|".to_string();
    let client = build_query_client(&config).await.unwrap();

    let err = client
        .query(
            &QueryKey::from(["a|b"]),
            || async { Ok(1u32) },
            &config.query.to_query_options(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_invalid_key());
}

#[tokio::test]
async fn test_invalid_config_fails_to_build() {
    let mut config = memory_config();
    config.cache.max_entries = 0;

    assert!(build_query_client(&config).await.is_err());
}
