//! Query Client
//!
//! Stale-while-revalidate orchestration on top of the cache and event ports.
//!
//! ## Read path
//!
//! ```text
//! query(key)
//!   ├─ live entry, fresh ─────────────► cache hit
//!   ├─ live entry, stale ─────────────► cache hit (is_stale) + detached refresh
//!   └─ absent or expired ─► fetch ─► persist ─► publish update ─► fresh result
//! ```
//!
//! ## Write path
//!
//! Mutations run the caller's function, then remove the affected keys and
//! announce them to peer instances. Optimistic mutations write a provisional
//! value first and discard it if the mutation fails.
//!
//! Every operation accepts a [`CancellationToken`]. Detached refreshes are
//! bound to the client's own shutdown signal instead of the caller's.

mod builder;
mod invalidation;
mod metadata;
mod retry;

pub use builder::QueryClientBuilder;

use self::metadata::MetadataStore;
use self::retry::{RetryPolicy, cancellable, ensure_not_cancelled, run_with_retry};
use revalid_domain::entities::{CacheEntry, CacheEntryMetadata, QueryMetadata};
use revalid_domain::error::{Error, Result};
use revalid_domain::events::{CacheInvalidationEvent, CacheUpdatedEvent, InvalidationReason};
use revalid_domain::ports::{
    CacheProvider, EventProvider, KeyGenerator, SharedClock, SubscriptionId,
};
use revalid_domain::value_objects::{
    CacheEntryOptions, MutationOptions, OptimisticMutationOptions, QueryKey, QueryOptions,
    QueryResult,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Which queries an invalidation applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    /// Every key this client has written or served
    All,
    /// One key, whether tracked or not
    Exact(QueryKey),
    /// Tracked keys whose leading segments equal the prefix
    Prefix(QueryKey),
}

impl QueryTarget {
    /// Target a single key
    pub fn exact<K: Into<QueryKey>>(key: K) -> Self {
        Self::Exact(key.into())
    }

    /// Target every tracked key under `prefix`
    pub fn prefix<K: Into<QueryKey>>(prefix: K) -> Self {
        Self::Prefix(prefix.into())
    }
}

/// Query and mutation orchestrator
///
/// Cheap to clone; clones share the same state, and [`QueryClient::shutdown`]
/// on any clone disposes all of them.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

struct Inner {
    cache: Arc<dyn CacheProvider>,
    events: Option<Arc<dyn EventProvider>>,
    keys: Arc<dyn KeyGenerator>,
    clock: SharedClock,
    instance_id: String,
    metadata: MetadataStore,
    tracked: RwLock<HashMap<String, QueryKey>>,
    refreshing: Mutex<HashSet<String>>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
    disposed: AtomicBool,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("instance_id", &self.inner.instance_id)
            .field("cache", &self.inner.cache.provider_name())
            .field(
                "events",
                &self.inner.events.as_ref().map(|e| e.provider_name().to_string()),
            )
            .field("disposed", &self.inner.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

impl QueryClient {
    /// Start building a client around `cache`
    pub fn builder(cache: Arc<dyn CacheProvider>) -> QueryClientBuilder {
        QueryClientBuilder::new(cache)
    }

    /// Identity stamped on events this client publishes
    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    /// Whether [`QueryClient::shutdown`] has run
    pub fn is_shutdown(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of detached refresh tasks still running
    pub fn pending_background_refreshes(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Wait until every detached refresh started so far has finished
    pub async fn wait_for_background_refreshes(&self) {
        let tasks = &self.inner.tasks;
        tasks.close();
        tasks.wait().await;
        if !self.is_shutdown() {
            tasks.reopen();
        }
    }

    /// Read `key` through the cache, fetching on a miss
    ///
    /// A stale hit returns the cached value immediately and refreshes it in
    /// the background when `options.enable_background_refetch` is set.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the key fails validation
    /// - `InvalidArgument` if the options are inconsistent
    /// - the fetch error after retries, when `options.throw_on_error` is set
    /// - `Cancelled` if `ct` fires before data is available
    /// - `ObjectDisposed` after shutdown
    pub async fn query<T, F, Fut>(
        &self,
        key: &QueryKey,
        fetch: F,
        options: &QueryOptions,
        ct: &CancellationToken,
    ) -> Result<QueryResult<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        options.validate()?;
        let canonical = inner.canonical(key)?;
        ensure_not_cancelled(ct, "query")?;
        let started = Instant::now();

        if let Some(entry) = inner.read_entry::<T>(&canonical, ct).await? {
            let now = inner.clock.now();
            let is_stale = entry.is_stale_at(now);
            inner.track(&canonical, key);
            inner.metadata.update(&canonical, key, now, |m| {
                m.record_cache_hit(now, entry.stale_at, entry.expires_at)
            });
            if is_stale && options.enable_background_refetch {
                inner.schedule_refresh(canonical.clone(), key.clone(), fetch, options.clone());
            }
            debug!(key = %canonical, stale = is_stale, "Cache hit");
            let envelope = entry.metadata(&canonical);
            return Ok(QueryResult::from_cache(
                entry.value,
                &envelope,
                is_stale,
                started.elapsed(),
            ));
        }

        debug!(key = %canonical, "Cache miss, fetching");
        match run_with_retry("query", &fetch, RetryPolicy::from(options), ct).await {
            Ok(data) => {
                let duration = started.elapsed();
                ensure_not_cancelled(ct, "query")?;
                let entry_options = inner.entry_options(options.to_entry_options());
                let envelope = match inner.persist(&canonical, key, &data, &entry_options).await {
                    Ok(envelope) => {
                        inner
                            .announce_update(CacheUpdatedEvent::for_key(
                                key.clone(),
                                inner.instance_id.as_str(),
                                inner.clock.now(),
                                envelope.size_bytes,
                                false,
                            ))
                            .await;
                        Some(envelope)
                    }
                    Err(e) => {
                        warn!(key = %canonical, error = %e, "Failed to cache fetched data");
                        None
                    }
                };
                let now = inner.clock.now();
                let (stale_at, expires_at) = envelope
                    .as_ref()
                    .map_or((None, None), |e| (e.stale_at, e.expires_at));
                inner.metadata.update(&canonical, key, now, |m| {
                    m.record_fetch(now, duration, stale_at, expires_at)
                });
                Ok(QueryResult::from_fresh(data, envelope.as_ref(), duration))
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                let now = inner.clock.now();
                let message = e.to_string();
                inner
                    .metadata
                    .update(&canonical, key, now, |m| m.record_failed_fetch(now, &message));
                warn!(key = %canonical, error = %message, "Query fetch failed");
                if options.throw_on_error {
                    Err(e)
                } else {
                    Ok(QueryResult::from_error(e, started.elapsed()))
                }
            }
        }
    }

    /// Cached data for `key` without fetching
    pub async fn get_query_data<T>(
        &self,
        key: &QueryKey,
        ct: &CancellationToken,
    ) -> Result<Option<QueryResult<T>>>
    where
        T: DeserializeOwned + Send,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        let canonical = inner.canonical(key)?;
        ensure_not_cancelled(ct, "get query data")?;
        let started = Instant::now();

        let Some(entry) = inner.read_entry::<T>(&canonical, ct).await? else {
            return Ok(None);
        };
        let now = inner.clock.now();
        let is_stale = entry.is_stale_at(now);
        inner.track(&canonical, key);
        inner.metadata.update(&canonical, key, now, |m| {
            m.record_cache_hit(now, entry.stale_at, entry.expires_at)
        });
        let envelope = entry.metadata(&canonical);
        Ok(Some(QueryResult::from_cache(
            entry.value,
            &envelope,
            is_stale,
            started.elapsed(),
        )))
    }

    /// Write `data` for `key` directly
    ///
    /// Without explicit options the entry lives for the default manual TTL.
    pub async fn set_query_data<T>(
        &self,
        key: &QueryKey,
        data: &T,
        options: Option<CacheEntryOptions>,
        ct: &CancellationToken,
    ) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        let canonical = inner.canonical(key)?;
        ensure_not_cancelled(ct, "set query data")?;
        let entry_options = inner.entry_options(options.unwrap_or_else(CacheEntryOptions::manual));
        inner.persist(&canonical, key, data, &entry_options).await?;
        debug!(key = %canonical, "Query data set");
        Ok(())
    }

    /// Replace the cached data for `key` with `updater(current)`
    ///
    /// # Returns
    /// False if nothing was cached for `key`
    pub async fn update_query_data<T, U>(
        &self,
        key: &QueryKey,
        updater: U,
        options: Option<CacheEntryOptions>,
        ct: &CancellationToken,
    ) -> Result<bool>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        U: FnOnce(T) -> T + Send,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        let canonical = inner.canonical(key)?;
        ensure_not_cancelled(ct, "update query data")?;

        let Some(entry) = inner.read_entry::<T>(&canonical, ct).await? else {
            debug!(key = %canonical, "No cached data to update");
            return Ok(false);
        };
        let updated = updater(entry.value);
        ensure_not_cancelled(ct, "update query data")?;
        let entry_options = inner.entry_options(options.unwrap_or_else(CacheEntryOptions::manual));
        inner.persist(&canonical, key, &updated, &entry_options).await?;
        Ok(true)
    }

    /// Remove the targeted queries and announce them to peers
    ///
    /// # Returns
    /// Number of entries removed from the cache
    pub async fn invalidate_queries(
        &self,
        target: QueryTarget,
        ct: &CancellationToken,
    ) -> Result<usize> {
        self.inner.ensure_active()?;
        ensure_not_cancelled(ct, "invalidate queries")?;
        self.inner
            .invalidate_target(&target, InvalidationReason::Manual)
            .await
    }

    /// Remove the targeted queries so the next read fetches them again
    pub async fn refetch_queries(
        &self,
        target: QueryTarget,
        ct: &CancellationToken,
    ) -> Result<usize> {
        self.inner.ensure_active()?;
        ensure_not_cancelled(ct, "refetch queries")?;
        self.inner
            .invalidate_target(&target, InvalidationReason::Refresh)
            .await
    }

    /// Remove every entry written with `tag` and announce the tag to peers
    pub async fn invalidate_tag(&self, tag: &str, ct: &CancellationToken) -> Result<usize> {
        let inner = &self.inner;
        inner.ensure_active()?;
        if tag.trim().is_empty() {
            return Err(Error::invalid_argument("tag cannot be empty"));
        }
        ensure_not_cancelled(ct, "invalidate tag")?;

        let removed = inner.cache.invalidate_by_tag(&inner.keys.tag_key(tag)).await?;
        inner
            .announce_invalidation(CacheInvalidationEvent::for_tag(
                tag,
                inner.instance_id.as_str(),
                inner.clock.now(),
            ))
            .await;
        info!(tag, removed, "Invalidated tag");
        Ok(removed)
    }

    /// Run `mutation`, then invalidate the keys named in `options`
    ///
    /// A failing mutation propagates unchanged and invalidates nothing.
    /// Failures of the invalidation step itself only propagate when
    /// `options.throw_on_error` is set.
    pub async fn mutate<R, F, Fut>(
        &self,
        mutation: F,
        options: &MutationOptions,
        ct: &CancellationToken,
    ) -> Result<R>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<R>> + Send,
        R: Send,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        let mut seen = HashSet::new();
        let invalidations = inner.unique_keys(&options.invalidate_keys, &mut seen)?;
        let refetches = inner.unique_keys(&options.refetch_keys, &mut seen)?;

        let result =
            run_with_retry("mutation", &mutation, RetryPolicy::from(options), ct).await?;

        let publish = options.publish_event;
        let outcome = match inner
            .remove_and_announce(&invalidations, InvalidationReason::Manual, publish)
            .await
        {
            Ok(()) => {
                inner
                    .remove_and_announce(&refetches, InvalidationReason::Refresh, publish)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            if options.throw_on_error {
                return Err(e);
            }
            warn!(error = %e, "Post-mutation invalidation failed");
        }
        debug!(
            invalidated = invalidations.len(),
            refetched = refetches.len(),
            "Mutation completed"
        );
        Ok(result)
    }

    /// Run `mutation` with a provisional value written to the cache first
    ///
    /// On failure the provisional entries are removed (when
    /// `rollback_on_error` is set), `on_error` runs, and the cause is
    /// returned wrapped in `Error::Mutation`.
    pub async fn mutate_optimistic<T, F, Fut>(
        &self,
        mutation: F,
        options: OptimisticMutationOptions<T>,
        ct: &CancellationToken,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let inner = &self.inner;
        inner.ensure_active()?;
        options.validate()?;
        let targets = inner.unique_keys(&options.query_keys, &mut HashSet::new())?;
        let entry_options = inner.entry_options(options.entry_options.clone());

        match self
            .run_optimistic(&mutation, &options, &targets, &entry_options, ct)
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => {
                if options.rollback_on_error {
                    for (canonical, _) in &targets {
                        if let Err(remove_error) = inner.cache.remove(canonical).await {
                            warn!(key = %canonical, error = %remove_error, "Rollback failed to remove key");
                        }
                        inner.untrack(canonical);
                    }
                    debug!(keys = targets.len(), "Optimistic values rolled back");
                }
                if let Some(on_error) = &options.on_error {
                    on_error(&e);
                }
                Err(Error::mutation("Optimistic mutation failed", e))
            }
        }
    }

    async fn run_optimistic<T, F, Fut>(
        &self,
        mutation: &F,
        options: &OptimisticMutationOptions<T>,
        targets: &[(String, QueryKey)],
        entry_options: &CacheEntryOptions,
        ct: &CancellationToken,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let inner = &self.inner;
        let mut had_prior = Vec::with_capacity(targets.len());
        for (canonical, key) in targets {
            ensure_not_cancelled(ct, "optimistic mutation")?;
            had_prior.push(inner.cache.exists(canonical).await?);
            let value = match (options.optimistic_value)() {
                Some(value) => value,
                None => match inner.read_entry::<T>(canonical, ct).await? {
                    Some(entry) => entry.value,
                    None => {
                        return Err(Error::invalid_operation(format!(
                            "No optimistic value or cached data for key {key}"
                        )));
                    }
                },
            };
            inner.persist(canonical, key, &value, entry_options).await?;
        }

        let result = run_with_retry(
            "optimistic mutation",
            mutation,
            RetryPolicy::once(options.timeout),
            ct,
        )
        .await?;

        let mut written = Vec::with_capacity(targets.len());
        let mut data_size_bytes = 0;
        for ((canonical, key), existed) in targets.iter().zip(had_prior) {
            let envelope = match &options.on_success {
                Some(transform) => {
                    // the optimistic write alone never keeps a transformed entry
                    if !existed {
                        continue;
                    }
                    let transformed = transform(&result);
                    inner.persist(canonical, key, &transformed, entry_options).await?
                }
                None => inner.persist(canonical, key, &result, entry_options).await?,
            };
            data_size_bytes += envelope.size_bytes;
            written.push(key.clone());
        }

        if !written.is_empty() {
            inner
                .announce_update(CacheUpdatedEvent {
                    keys: written,
                    source_instance: inner.instance_id.clone(),
                    timestamp: inner.clock.now(),
                    data_size_bytes,
                    is_background_refresh: false,
                })
                .await;
        }
        Ok(result)
    }

    /// Statistics recorded for `key`
    pub fn get_query_metadata(&self, key: &QueryKey) -> Result<Option<QueryMetadata>> {
        self.inner.ensure_active()?;
        let canonical = self.inner.canonical(key)?;
        Ok(self.inner.metadata.get(&canonical))
    }

    /// Tracked keys that still have a live cache entry, in canonical order
    pub async fn list_active_keys(&self, ct: &CancellationToken) -> Result<Vec<QueryKey>> {
        let inner = &self.inner;
        inner.ensure_active()?;
        let mut snapshot = inner.tracked_snapshot();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));

        let mut active = Vec::with_capacity(snapshot.len());
        for (canonical, key) in snapshot {
            ensure_not_cancelled(ct, "list active keys")?;
            match inner.cache.exists(&canonical).await {
                Ok(true) => active.push(key),
                Ok(false) => inner.untrack(&canonical),
                Err(e) => warn!(key = %canonical, error = %e, "Failed to check cache key"),
            }
        }
        Ok(active)
    }

    /// Remove every tracked key from the cache and forget all statistics
    pub async fn reset(&self, ct: &CancellationToken) -> Result<()> {
        let inner = &self.inner;
        inner.ensure_active()?;
        ensure_not_cancelled(ct, "reset")?;

        let canonicals: Vec<String> = inner
            .tracked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(canonical, _)| canonical)
            .collect();
        let removed = inner.cache.remove_bulk(&canonicals).await?;
        inner.metadata.clear();
        info!(removed, "Query client reset");
        Ok(())
    }

    /// Dispose the client
    ///
    /// Unsubscribes from remote invalidations, stops detached refreshes and
    /// clears local state. Safe to call more than once; every other
    /// operation fails with `ObjectDisposed` afterwards.
    pub async fn shutdown(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscription = inner
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(events), Some(id)) = (&inner.events, subscription) {
            if let Err(e) = events.unsubscribe(id).await {
                warn!(subscription = %id, error = %e, "Failed to unsubscribe from invalidations");
            }
        }

        inner.shutdown.cancel();
        inner.tasks.close();
        inner.tasks.wait().await;
        inner.metadata.clear();
        inner
            .tracked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!(instance_id = %inner.instance_id, "Query client shut down");
    }
}

impl Inner {
    fn ensure_active(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(Error::object_disposed("QueryClient"))
        } else {
            Ok(())
        }
    }

    fn canonical(&self, key: &QueryKey) -> Result<String> {
        self.keys.generate_or_fail(key)
    }

    /// Canonicalize `keys`, skipping any already in `seen`
    fn unique_keys(
        &self,
        keys: &[QueryKey],
        seen: &mut HashSet<String>,
    ) -> Result<Vec<(String, QueryKey)>> {
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            let canonical = self.canonical(key)?;
            if seen.insert(canonical.clone()) {
                unique.push((canonical, key.clone()));
            }
        }
        Ok(unique)
    }

    fn track(&self, canonical: &str, key: &QueryKey) {
        let mut tracked = self.tracked.write().unwrap_or_else(PoisonError::into_inner);
        if !tracked.contains_key(canonical) {
            tracked.insert(canonical.to_string(), key.clone());
        }
    }

    fn untrack(&self, canonical: &str) {
        self.tracked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(canonical);
    }

    fn tracked_snapshot(&self) -> Vec<(String, QueryKey)> {
        self.tracked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(canonical, key)| (canonical.clone(), key.clone()))
            .collect()
    }

    /// Entry options with tags folded into tag keys
    fn entry_options(&self, mut options: CacheEntryOptions) -> CacheEntryOptions {
        options.tags = options
            .tags
            .iter()
            .map(|tag| self.keys.tag_key(tag))
            .collect();
        options
    }

    /// Live, decodable entry for `canonical`
    ///
    /// Provider failures and undecodable payloads read as a miss; an
    /// undecodable entry is removed. Only cancellation propagates.
    async fn read_entry<T>(
        &self,
        canonical: &str,
        ct: &CancellationToken,
    ) -> Result<Option<CacheEntry<T>>>
    where
        T: DeserializeOwned,
    {
        let raw = match cancellable(ct, "cache read", self.cache.get_entry(canonical)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!(key = %canonical, error = %e, "Cache read failed, treating as miss");
                return Ok(None);
            }
        };
        if raw.is_expired_at(self.clock.now()) {
            return Ok(None);
        }
        match raw.decode::<T>() {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key = %canonical, error = %e, "Undecodable cache entry, removing");
                if let Err(remove_error) = self.cache.remove(canonical).await {
                    warn!(key = %canonical, error = %remove_error, "Failed to remove corrupted entry");
                }
                Ok(None)
            }
        }
    }

    /// Encode and store `value`, returning the envelope that was written
    async fn persist<T>(
        &self,
        canonical: &str,
        key: &QueryKey,
        value: &T,
        options: &CacheEntryOptions,
    ) -> Result<CacheEntryMetadata>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(value)?;
        let written = CacheEntry::from_payload(payload, options, self.clock.now());
        let envelope = written.metadata(canonical);
        self.cache.set(canonical, written.value, options).await?;
        self.track(canonical, key);
        Ok(envelope)
    }

    async fn announce_invalidation(&self, event: CacheInvalidationEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.publish_invalidation(&event).await {
                warn!(reason = %event.reason, error = %e, "Failed to publish invalidation");
            }
        }
    }

    async fn announce_update(&self, event: CacheUpdatedEvent) {
        if let Some(events) = &self.events {
            if let Err(e) = events.publish_update(&event).await {
                warn!(keys = event.keys.len(), error = %e, "Failed to publish cache update");
            }
        }
    }

    /// Remove each key, then publish one event per key
    ///
    /// Keeps going past failures and reports the first one.
    async fn remove_and_announce(
        &self,
        targets: &[(String, QueryKey)],
        reason: InvalidationReason,
        publish: bool,
    ) -> Result<()> {
        let mut first_error = None;
        for (canonical, key) in targets {
            if let Err(e) = self.cache.remove(canonical).await {
                warn!(key = %canonical, error = %e, "Failed to remove key");
                first_error.get_or_insert(e);
            }
            self.untrack(canonical);

            let Some(events) = self.events.as_ref().filter(|_| publish) else {
                continue;
            };
            let event = CacheInvalidationEvent::for_key(
                key.clone(),
                reason,
                self.instance_id.as_str(),
                self.clock.now(),
            );
            if let Err(e) = events.publish_invalidation(&event).await {
                warn!(key = %canonical, error = %e, "Failed to publish invalidation");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn invalidate_target(
        &self,
        target: &QueryTarget,
        reason: InvalidationReason,
    ) -> Result<usize> {
        let targets = match target {
            QueryTarget::All => self.tracked_snapshot(),
            QueryTarget::Exact(key) => vec![(self.canonical(key)?, key.clone())],
            QueryTarget::Prefix(prefix) => {
                self.canonical(prefix)?;
                self.tracked_snapshot()
                    .into_iter()
                    .filter(|(_, key)| key.starts_with(prefix))
                    .collect()
            }
        };
        if targets.is_empty() {
            return Ok(0);
        }

        let canonicals: Vec<String> = targets.iter().map(|(c, _)| c.clone()).collect();
        let removed = self.cache.remove_bulk(&canonicals).await?;
        for canonical in &canonicals {
            self.untrack(canonical);
        }
        let keys = targets.into_iter().map(|(_, key)| key).collect();
        self.announce_invalidation(CacheInvalidationEvent::new(
            keys,
            reason,
            self.instance_id.as_str(),
            self.clock.now(),
        ))
        .await;
        info!(removed, reason = %reason, "Invalidated queries");
        Ok(removed)
    }

    /// Start a detached refresh of `canonical` unless one is already running
    fn schedule_refresh<T, F, Fut>(
        self: &Arc<Self>,
        canonical: String,
        key: QueryKey,
        fetch: F,
        options: QueryOptions,
    ) where
        T: Serialize + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let newly_claimed = self
            .refreshing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canonical.clone());
        if !newly_claimed {
            debug!(key = %canonical, "Background refresh already in flight");
            return;
        }

        let inner = Arc::clone(self);
        self.tasks.spawn(async move {
            let guard = RefreshGuard {
                inner: Arc::clone(&inner),
                canonical,
            };
            inner.refresh(&guard.canonical, &key, &fetch, &options).await;
        });
    }

    async fn refresh<T, F, Fut>(
        &self,
        canonical: &str,
        key: &QueryKey,
        fetch: &F,
        options: &QueryOptions,
    ) where
        T: Serialize + Send + Sync,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let started = Instant::now();
        let fetched =
            run_with_retry("background refresh", fetch, RetryPolicy::from(options), &self.shutdown)
                .await;
        let duration = started.elapsed();

        let outcome = match fetched {
            Ok(data) => {
                let entry_options = self.entry_options(options.to_entry_options());
                self.persist(canonical, key, &data, &entry_options).await
            }
            Err(e) => Err(e),
        };

        let now = self.clock.now();
        match outcome {
            Ok(envelope) => {
                self.metadata.update(canonical, key, now, |m| {
                    m.record_refresh(now, duration, envelope.stale_at, envelope.expires_at)
                });
                self.announce_update(CacheUpdatedEvent::for_key(
                    key.clone(),
                    self.instance_id.as_str(),
                    now,
                    envelope.size_bytes,
                    true,
                ))
                .await;
                debug!(key = %canonical, duration_ms = duration.as_millis() as u64, "Background refresh completed");
            }
            Err(e) if e.is_cancelled() => {
                debug!(key = %canonical, "Background refresh stopped by shutdown");
            }
            Err(e) => {
                let message = e.to_string();
                self.metadata
                    .update(canonical, key, now, |m| m.record_error(now, &message));
                warn!(key = %canonical, error = %message, "Background refresh failed");
            }
        }
    }
}

/// Releases the in-flight claim on a key when a refresh task ends
struct RefreshGuard {
    inner: Arc<Inner>,
    canonical: String,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.inner
            .refreshing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.canonical);
    }
}
