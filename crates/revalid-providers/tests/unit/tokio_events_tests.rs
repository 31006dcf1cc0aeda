//! Event contract tests against the tokio broadcast provider

use chrono::Utc;
use revalid_domain::error::Error;
use revalid_domain::events::{CacheInvalidationEvent, CacheUpdatedEvent, InvalidationReason};
use revalid_domain::ports::{EventProvider, handler_fn};
use revalid_domain::value_objects::QueryKey;
use revalid_providers::events::TokioEventProvider;
use std::time::Duration;
use tokio::sync::mpsc;

fn invalidation(key: &str) -> CacheInvalidationEvent {
    CacheInvalidationEvent::for_key(
        QueryKey::from(key),
        InvalidationReason::Manual,
        "node-a",
        Utc::now(),
    )
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event delivered in time")
        .expect("channel open")
}

#[tokio::test]
async fn test_every_handler_receives_the_event() {
    let provider = TokioEventProvider::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    for name in ["first", "second"] {
        let tx = tx.clone();
        provider
            .subscribe_to_invalidations(handler_fn(move |event: CacheInvalidationEvent| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send((name, event));
                    Ok(())
                }
            }))
            .await
            .unwrap();
    }

    provider.publish_invalidation(&invalidation("todos")).await.unwrap();

    let mut names = vec![recv(&mut rx).await.0, recv(&mut rx).await.0];
    names.sort_unstable();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn test_failing_handler_does_not_reach_publisher_or_siblings() {
    let provider = TokioEventProvider::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    provider
        .subscribe_to_invalidations(handler_fn(|_: CacheInvalidationEvent| async {
            Err(Error::from("handler failure"))
        }))
        .await
        .unwrap();
    provider
        .subscribe_to_invalidations(handler_fn(move |event: CacheInvalidationEvent| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok(())
            }
        }))
        .await
        .unwrap();

    let event = invalidation("todos");
    provider.publish_invalidation(&event).await.unwrap();

    assert_eq!(recv(&mut rx).await, event);
}

#[tokio::test]
async fn test_updates_and_invalidations_are_separate_streams() {
    let provider = TokioEventProvider::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    provider
        .subscribe_to_updates(handler_fn(move |event: CacheUpdatedEvent| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok(())
            }
        }))
        .await
        .unwrap();

    provider.publish_invalidation(&invalidation("ignored")).await.unwrap();
    let update = CacheUpdatedEvent::for_key(QueryKey::from("todos"), "node-a", Utc::now(), 12, true);
    provider.publish_update(&update).await.unwrap();

    let received = recv(&mut rx).await;
    assert_eq!(received, update);
    assert!(received.is_background_refresh);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let provider = TokioEventProvider::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = provider
        .subscribe_to_invalidations(handler_fn(move |event: CacheInvalidationEvent| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
                Ok(())
            }
        }))
        .await
        .unwrap();

    assert!(provider.unsubscribe(id).await.unwrap());
    assert!(!provider.unsubscribe(id).await.unwrap());
    provider.publish_invalidation(&invalidation("todos")).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(outcome.is_err() || outcome.unwrap().is_none());
}

#[tokio::test]
async fn test_in_process_provider_is_always_connected() {
    let provider = TokioEventProvider::new();

    provider.ensure_connected().await.unwrap();

    assert!(provider.is_connected().await);
    assert_eq!(provider.provider_name(), "tokio");
}
