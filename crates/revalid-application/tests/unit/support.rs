//! Shared fixtures for query client tests

use revalid_application::QueryClient;
use revalid_domain::error::Result;
use revalid_domain::ports::{ManualClock, SharedClock};
use revalid_providers::cache::MemoryCacheProvider;
use revalid_providers::events::TokioEventProvider;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Client over a fresh memory cache driven by a manual clock
pub async fn client_with_clock() -> (QueryClient, ManualClock) {
    let clock = ManualClock::new();
    let shared: SharedClock = Arc::new(clock.clone());
    let cache = Arc::new(MemoryCacheProvider::with_clock(Arc::clone(&shared)));
    let client = QueryClient::builder(cache)
        .with_clock(shared)
        .build()
        .await
        .unwrap();
    (client, clock)
}

/// Client with its own memory cache sharing `events` with its peers
pub async fn peer(events: &Arc<TokioEventProvider>, instance_id: &str) -> QueryClient {
    QueryClient::builder(Arc::new(MemoryCacheProvider::new()))
        .with_events(Arc::clone(events) as _)
        .with_instance_id(instance_id)
        .build()
        .await
        .unwrap()
}

/// Fetcher returning `value` and counting its calls
pub fn counting_fetch<T>(
    value: T,
    calls: &Arc<AtomicUsize>,
) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<T>> + Send>> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        Box::pin(async move { Ok(value) })
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
