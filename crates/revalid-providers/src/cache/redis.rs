//! Redis distributed cache provider
//!
//! Distributed cache implementation using Redis as the backend.
//! Suitable for multi-instance deployments sharing one store.
//!
//! ## Layout
//!
//! ```text
//! {namespace}:d:{key}   JSON envelope of the entry, PX = remaining lifetime
//! {namespace}:t:{tag}   SET of data keys written with the tag
//! ```
//!
//! Data and tag index are written in one MULTI/EXEC pipeline, so a reader
//! never sees a half-written entry. Access statistics are applied to the
//! returned copy only.
//!
//! ## Example
//!
//! ```ignore
//! use revalid_providers::cache::RedisCacheProvider;
//!
//! let provider = RedisCacheProvider::new("redis://localhost:6379")?;
//! ```

use crate::constants::{
    CACHE_NAMESPACE_SEPARATOR, REDIS_DATA_SEGMENT, REDIS_DEFAULT_NAMESPACE, REDIS_TAG_SEGMENT,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use revalid_domain::entities::{CacheEntry, CacheEntryMetadata};
use revalid_domain::error::{Error, Result};
use revalid_domain::ports::{CacheProvider, SharedClock, SystemClock};
use revalid_domain::value_objects::CacheEntryOptions;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Redis cache provider
///
/// The connection is established on first use and shared afterwards; the
/// connection manager reconnects on its own.
pub struct RedisCacheProvider {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    namespace: String,
    clock: SharedClock,
}

impl RedisCacheProvider {
    /// Create a new Redis cache provider with connection string
    ///
    /// # Arguments
    ///
    /// * `connection_string` - Redis connection URL (e.g., "redis://localhost:6379")
    pub fn new(connection_string: &str) -> Result<Self> {
        let client = Client::open(connection_string).map_err(|e| {
            Error::cache_provider_with_source(
                format!("Failed to create Redis client for {connection_string}"),
                e,
            )
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            namespace: REDIS_DEFAULT_NAMESPACE.to_string(),
            clock: SystemClock::shared(),
        })
    }

    /// Prefix every key with `namespace`
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Evaluate expiry against `clock`
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Configured namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .get_or_try_init(|| async {
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| Error::cache_provider_with_source("Failed to connect to Redis", e))
            })
            .await
            .cloned()
    }

    fn data_key(&self, key: &str) -> String {
        [self.namespace.as_str(), REDIS_DATA_SEGMENT, key].join(CACHE_NAMESPACE_SEPARATOR)
    }

    fn tag_key(&self, tag: &str) -> String {
        [self.namespace.as_str(), REDIS_TAG_SEGMENT, tag].join(CACHE_NAMESPACE_SEPARATOR)
    }

    fn data_pattern(&self) -> String {
        format!("{}*", self.data_key(""))
    }

    async fn live_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        let mut conn = self.connection().await?;
        let data_key = self.data_key(key);
        let raw: Option<String> = conn
            .get(&data_key)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis GET failed", e))?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let entry: CacheEntry<String> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Dropping unreadable Redis entry");
                let _: i64 = conn.del(&data_key).await.unwrap_or(0);
                return Ok(None);
            }
        };
        if entry.is_expired_at(self.clock.now()) {
            let _: i64 = conn.del(&data_key).await.unwrap_or(0);
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry<String>>> {
        let entry = self.live_entry(key).await?;
        Ok(entry.map(|mut entry| {
            entry.record_access(self.clock.now());
            entry
        }))
    }

    async fn set(&self, key: &str, payload: String, options: &CacheEntryOptions) -> Result<()> {
        let now = self.clock.now();
        let entry = CacheEntry::from_payload(payload, options, now);
        let json = serde_json::to_string(&entry)?;
        let data_key = self.data_key(key);

        let mut pipe = redis::pipe();
        pipe.atomic();
        match options.remaining_ttl(now) {
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                pipe.cmd("SET")
                    .arg(&data_key)
                    .arg(&json)
                    .arg("PX")
                    .arg(millis)
                    .ignore();
            }
            None => {
                pipe.cmd("SET").arg(&data_key).arg(&json).ignore();
            }
        }
        for tag in &entry.tags {
            pipe.cmd("SADD").arg(self.tag_key(tag)).arg(&data_key).ignore();
        }

        let mut conn = self.connection().await?;
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis SET failed", e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_entry(key).await?.is_some())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<CacheEntryMetadata>> {
        Ok(self.live_entry(key).await?.map(|entry| entry.metadata(key)))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn
            .del(self.data_key(key))
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis DEL failed", e))?;
        Ok(deleted > 0)
    }

    async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let mut conn = self.connection().await?;
        let tag_key = self.tag_key(tag);
        let members: Vec<String> = conn
            .smembers(&tag_key)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis SMEMBERS failed", e))?;

        let mut removed = 0;
        for member in &members {
            let deleted: redis::RedisResult<i64> = conn.del(member).await;
            match deleted {
                Ok(count) => removed += usize::try_from(count).unwrap_or(0),
                Err(e) => warn!(key = %member, error = %e, "Failed to remove tagged key"),
            }
        }
        let _: i64 = conn
            .del(&tag_key)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis DEL failed", e))?;
        debug!(tag, removed, "Invalidated tag");
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}{CACHE_NAMESPACE_SEPARATOR}*", self.namespace);
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis KEYS failed", e))?;
        if keys.is_empty() {
            return Ok(());
        }
        let _: i64 = conn
            .del(&keys)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis DEL failed", e))?;
        Ok(())
    }

    async fn size(&self) -> Result<usize> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(self.data_pattern())
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::cache_provider_with_source("Redis KEYS failed", e))?;
        Ok(keys.len())
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}

impl std::fmt::Debug for RedisCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheProvider")
            .field("namespace", &self.namespace)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

// ============================================================================
// Auto-registration via linkme
// ============================================================================

use revalid_application::registry::{CACHE_PROVIDERS, CacheProviderConfig, CacheProviderEntry};

#[linkme::distributed_slice(CACHE_PROVIDERS)]
static REDIS_PROVIDER: CacheProviderEntry = CacheProviderEntry {
    name: "redis",
    description: "Redis distributed cache",
    factory: |config: &CacheProviderConfig| {
        let uri = config
            .uri
            .as_deref()
            .ok_or_else(|| Error::configuration("Redis cache provider requires a URI"))?;
        let mut provider = RedisCacheProvider::new(uri)?.with_clock(config.clock.clone());
        if let Some(namespace) = &config.namespace {
            provider = provider.with_namespace(namespace.clone());
        }
        Ok(std::sync::Arc::new(provider))
    },
};
