//! Mutations and optimistic updates

use crate::support::{client_with_clock, eventually, peer};
use revalid_domain::error::Error;
use revalid_domain::events::{CacheInvalidationEvent, InvalidationReason};
use revalid_domain::ports::{EventProvider, handler_fn};
use revalid_domain::value_objects::{
    MutationOptions, OptimisticMutationOptions, QueryKey,
};
use revalid_providers::events::TokioEventProvider;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_mutation_invalidates_each_key_once() {
    let events = Arc::new(TokioEventProvider::new());
    let client = peer(&events, "writer").await;
    let ct = CancellationToken::new();
    for key in ["a", "b"] {
        client
            .set_query_data(&QueryKey::from(key), &1u32, None, &ct)
            .await
            .unwrap();
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events
        .subscribe_to_invalidations(handler_fn(move |event: CacheInvalidationEvent| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(event);
                Ok(())
            }
        }))
        .await
        .unwrap();

    let options = MutationOptions::new()
        .invalidate("a")
        .invalidate("a")
        .refetch("a")
        .refetch("b");
    let result = client
        .mutate(|| async { Ok("saved") }, &options, &ct)
        .await
        .unwrap();

    assert_eq!(result, "saved");
    assert!(eventually(|| async { seen.lock().unwrap().len() >= 2 }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].keys, vec![QueryKey::from("a")]);
    assert_eq!(seen[0].reason, InvalidationReason::Manual);
    assert_eq!(seen[1].keys, vec![QueryKey::from("b")]);
    assert_eq!(seen[1].reason, InvalidationReason::Refresh);
    assert!(seen.iter().all(|e| e.source_instance == "writer"));

    for key in ["a", "b"] {
        let cached = client
            .get_query_data::<u32>(&QueryKey::from(key), &ct)
            .await
            .unwrap();
        assert!(cached.is_none());
    }
}

#[tokio::test]
async fn test_failed_mutation_invalidates_nothing() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let key = QueryKey::from("a");
    client.set_query_data(&key, &1u32, None, &ct).await.unwrap();

    let err = client
        .mutate(
            || async { Err::<(), _>(Error::from("rejected")) },
            &MutationOptions::new().invalidate("a"),
            &ct,
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("rejected"));
    assert!(client.get_query_data::<u32>(&key, &ct).await.unwrap().is_some());
}

#[tokio::test]
async fn test_mutation_retries() {
    let (client, _clock) = client_with_clock().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let value = client
        .mutate(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::from("transient"))
                    } else {
                        Ok(5u32)
                    }
                }
            },
            &MutationOptions::new().with_retry(1, Duration::from_millis(1)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(value, 5);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mutation_rejects_invalid_keys_before_running() {
    let (client, _clock) = client_with_clock().await;
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    let err = client
        .mutate(
            move || {
                flag.store(true, Ordering::SeqCst);
                async { Ok(()) }
            },
            &MutationOptions::new().invalidate(["bad*key"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.is_invalid_key());
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_optimistic_value_replaced_by_success_transform() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let key = QueryKey::from(["todos", "1"]);
    client
        .set_query_data(&key, &"draft".to_string(), None, &ct)
        .await
        .unwrap();
    let observed = Arc::new(Mutex::new(None));

    let options = OptimisticMutationOptions::new([key.clone()], || Some("pending".to_string()))
        .with_on_success(|saved: &String| format!("{saved}!"));
    let reader = client.clone();
    let read_key = key.clone();
    let seen = Arc::clone(&observed);
    let result = client
        .mutate_optimistic(
            move || {
                let client = reader.clone();
                let key = read_key.clone();
                let seen = Arc::clone(&seen);
                async move {
                    let during = client
                        .get_query_data::<String>(&key, &CancellationToken::new())
                        .await?
                        .and_then(|r| r.into_data());
                    *seen.lock().unwrap() = during;
                    Ok("done".to_string())
                }
            },
            options,
            &ct,
        )
        .await
        .unwrap();

    assert_eq!(result, "done");
    assert_eq!(observed.lock().unwrap().as_deref(), Some("pending"));
    let stored = client.get_query_data::<String>(&key, &ct).await.unwrap().unwrap();
    assert_eq!(stored.into_data().as_deref(), Some("done!"));
}

#[tokio::test]
async fn test_success_transform_skips_keys_without_prior_data() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let cached = QueryKey::from("cached");
    let fresh = QueryKey::from("fresh");
    client
        .set_query_data(&cached, &"old".to_string(), None, &ct)
        .await
        .unwrap();

    let options =
        OptimisticMutationOptions::new([cached.clone(), fresh.clone()], || {
            Some("pending".to_string())
        })
        .with_on_success(|saved: &String| format!("{saved}!"));
    client
        .mutate_optimistic(|| async { Ok("done".to_string()) }, options, &ct)
        .await
        .unwrap();

    let cached_value = client
        .get_query_data::<String>(&cached, &ct)
        .await
        .unwrap()
        .and_then(|r| r.into_data());
    assert_eq!(cached_value.as_deref(), Some("done!"));
    let fresh_value = client
        .get_query_data::<String>(&fresh, &ct)
        .await
        .unwrap()
        .and_then(|r| r.into_data());
    assert_ne!(fresh_value.as_deref(), Some("done!"));
}

#[tokio::test]
async fn test_optimistic_failure_rolls_back() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let keys = [QueryKey::from("x"), QueryKey::from("y")];
    let on_error_called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&on_error_called);

    let options = OptimisticMutationOptions::new(keys.clone(), || Some(1u32))
        .with_on_error(move |_| flag.store(true, Ordering::SeqCst));
    let err = client
        .mutate_optimistic(
            || async { Err::<u32, _>(Error::from("server said no")) },
            options,
            &ct,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation { .. }));
    assert!(on_error_called.load(Ordering::SeqCst));
    for key in &keys {
        assert!(client.get_query_data::<u32>(key, &ct).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_optimistic_failure_without_rollback_keeps_value() {
    let (client, _clock) = client_with_clock().await;
    let ct = CancellationToken::new();
    let key = QueryKey::from("x");

    let options =
        OptimisticMutationOptions::new([key.clone()], || Some(9u32)).with_rollback_on_error(false);
    let err = client
        .mutate_optimistic(|| async { Err::<u32, _>(Error::from("nope")) }, options, &ct)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation { .. }));
    let kept = client.get_query_data::<u32>(&key, &ct).await.unwrap().unwrap();
    assert_eq!(kept.into_data(), Some(9));
}

#[tokio::test]
async fn test_optimistic_without_value_or_cache_fails() {
    let (client, _clock) = client_with_clock().await;
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    let options = OptimisticMutationOptions::new([QueryKey::from("empty")], || None::<u32>);
    let err = client
        .mutate_optimistic(
            move || {
                flag.store(true, Ordering::SeqCst);
                async { Ok(1u32) }
            },
            options,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation { .. }));
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_optimistic_requires_keys() {
    let (client, _clock) = client_with_clock().await;

    let options = OptimisticMutationOptions::new(Vec::<QueryKey>::new(), || Some(1u32));
    let err = client
        .mutate_optimistic(|| async { Ok(1u32) }, options, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
}
