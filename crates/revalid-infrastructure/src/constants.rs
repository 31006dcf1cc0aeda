//! Infrastructure layer constants
//!
//! Defaults for configuration loading and logging. Domain defaults live in
//! `revalid_domain::constants`, provider defaults in
//! `revalid_providers::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "revalid.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "revalid";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "REVALID";

/// Separator between the prefix and nested keys in environment variables
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// PROVIDER SELECTION
// ============================================================================

/// Cache provider used when none is configured
pub const DEFAULT_CACHE_PROVIDER: &str = "moka";

/// Event provider used when none is configured
pub const DEFAULT_EVENT_PROVIDER: &str = "tokio";

/// Cache provider that needs a connection URL
pub const REDIS_PROVIDER: &str = "redis";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Environment variable overriding the configured log filter
pub const LOG_ENV_VAR: &str = "REVALID_LOG";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File stem used when the log path has none
pub const DEFAULT_LOG_FILE_STEM: &str = "revalid";
