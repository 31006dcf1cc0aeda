//! Configuration loader
//!
//! Loads `AppConfig` from serialized defaults, a TOML file and environment
//! variables, in that order of precedence (later sources win).

use crate::config::AppConfig;
use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME,
    REDIS_PROVIDER,
};
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use revalid_application::registry::{list_cache_providers, list_event_providers};
use revalid_domain::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Configuration sources are merged in this order:
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (explicit path, or the first default location found)
    /// 3. Environment variables, e.g. `REVALID__CACHE__PROVIDER=redis`
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        match &self.config_path {
            Some(path) if path.exists() => {
                figment = figment.merge(Toml::file(path));
                log_config_loaded(path, true);
            }
            Some(path) => log_config_loaded(path, false),
            None => {
                if let Some(path) = Self::find_default_config_path() {
                    figment = figment.merge(Toml::file(&path));
                    log_config_loaded(&path, true);
                }
            }
        }

        let prefix = format!("{}{}", self.env_prefix, CONFIG_ENV_SEPARATOR);
        figment = figment.merge(Env::prefixed(&prefix).split(CONFIG_ENV_SEPARATOR));

        let config: AppConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Save configuration to file as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;
        std::fs::write(path.as_ref(), toml_string).context("Failed to write config file")?;
        Ok(())
    }

    /// Get the configured file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Validate configuration values
    ///
    /// Checks key settings, query time ordering, logging level, and that the
    /// selected providers are registered and have the URLs they need.
    pub fn validate(config: &AppConfig) -> Result<()> {
        validate_keys(config)?;
        validate_query(config)?;
        validate_cache(config)?;
        validate_events(config)?;
        parse_log_level(&config.logging.level)?;
        Ok(())
    }

    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;
        let candidates = [
            Some(current_dir.join(DEFAULT_CONFIG_FILENAME)),
            Some(
                current_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME),
            ),
            dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
        ];
        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

fn validate_keys(config: &AppConfig) -> Result<()> {
    if config.keys.separator.is_empty() {
        return Err(Error::configuration("Key separator cannot be empty"));
    }
    if config.keys.max_key_length < 2 {
        return Err(Error::configuration(format!(
            "Maximum key length must be at least 2, got {}",
            config.keys.max_key_length
        )));
    }
    Ok(())
}

fn validate_query(config: &AppConfig) -> Result<()> {
    let query = &config.query;
    if query.cache_time_secs < query.stale_time_secs {
        return Err(Error::configuration(format!(
            "Query cache time ({}s) must not be shorter than stale time ({}s)",
            query.cache_time_secs, query.stale_time_secs
        )));
    }
    if query.timeout_ms == Some(0) {
        return Err(Error::configuration("Query timeout cannot be 0"));
    }
    Ok(())
}

fn validate_cache(config: &AppConfig) -> Result<()> {
    let cache = &config.cache;
    let known: Vec<&str> = list_cache_providers().into_iter().map(|(name, _)| name).collect();
    if !known.contains(&cache.provider.as_str()) {
        return Err(Error::configuration(format!(
            "Unknown cache provider '{}'. Available providers: {:?}",
            cache.provider, known
        )));
    }
    if cache.max_entries == 0 {
        return Err(Error::configuration("Cache max entries cannot be 0"));
    }
    if cache.provider == REDIS_PROVIDER && cache.redis_url.is_none() {
        return Err(Error::configuration(
            "Redis URL is required when the redis cache provider is selected",
        ));
    }
    Ok(())
}

fn validate_events(config: &AppConfig) -> Result<()> {
    let events = &config.events;
    if !events.enabled {
        return Ok(());
    }
    let known: Vec<&str> = list_event_providers().into_iter().map(|(name, _)| name).collect();
    if !known.contains(&events.provider.as_str()) {
        return Err(Error::configuration(format!(
            "Unknown event provider '{}'. Available providers: {:?}",
            events.provider, known
        )));
    }
    if events.capacity == 0 {
        return Err(Error::configuration("Event capacity cannot be 0"));
    }
    if events.subject_prefix.trim().is_empty() {
        return Err(Error::configuration("Event subject prefix cannot be empty"));
    }
    Ok(())
}
