//! Client bootstrap
//!
//! Assembles a [`QueryClient`] from an [`AppConfig`]: resolves the cache and
//! event providers through the registries, builds the key generator and
//! assigns an instance identity.

use crate::config::{AppConfig, ConfigLoader};
use crate::logging::init_logging;
use anyhow::Context;
use revalid_application::QueryClient;
use revalid_application::registry::{resolve_cache_provider, resolve_event_provider};
use revalid_domain::error::Result;
use revalid_domain::ports::{SharedClock, SystemClock};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Instance identity from the host name and a random suffix
pub fn default_instance_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{host}-{}", Uuid::new_v4().simple())
}

/// Build a client for `config` on the wall clock
pub async fn build_query_client(config: &AppConfig) -> Result<QueryClient> {
    build_query_client_with_clock(config, SystemClock::shared()).await
}

/// Build a client for `config` whose providers and client share `clock`
pub async fn build_query_client_with_clock(
    config: &AppConfig,
    clock: SharedClock,
) -> Result<QueryClient> {
    ConfigLoader::validate(config)?;

    let cache = resolve_cache_provider(&config.cache.to_provider_config(Arc::clone(&clock)))?;
    let keys = config.keys.to_generator()?;
    let instance_id = config
        .instance_id
        .clone()
        .unwrap_or_else(default_instance_id);

    let mut builder = QueryClient::builder(cache)
        .with_key_generator(Arc::new(keys))
        .with_clock(Arc::clone(&clock))
        .with_instance_id(instance_id);
    if config.events.enabled {
        let events = resolve_event_provider(&config.events.to_provider_config(clock))?;
        builder = builder.with_events(events);
    }

    let client = builder.build().await?;
    let events = if config.events.enabled {
        config.events.provider.as_str()
    } else {
        "none"
    };
    info!(
        instance_id = client.instance_id(),
        cache = %config.cache.provider,
        events,
        "Query client bootstrapped"
    );
    Ok(client)
}

/// Load configuration, install logging and build a client
///
/// Entry point for binaries; `config_path` falls back to the default
/// configuration locations.
pub async fn init_from_config(config_path: Option<&Path>) -> anyhow::Result<(AppConfig, QueryClient)> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config_path {
        loader = loader.with_config_path(path);
    }
    let config = loader.load().context("loading configuration")?;
    init_logging(&config.logging).context("initializing logging")?;
    let client = build_query_client(&config)
        .await
        .context("building query client")?;
    Ok((config, client))
}
