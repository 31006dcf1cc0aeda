//! Domain constants
//!
//! Defaults shared by the key model, option types and providers.

use std::time::Duration;

// ============================================================================
// KEY MODEL
// ============================================================================

/// Default separator joining composite key segments
pub const DEFAULT_KEY_SEPARATOR: &str = ":";

/// Default maximum length of a canonical key
pub const DEFAULT_MAX_KEY_LENGTH: usize = 256;

/// Substrings that may never appear inside a key segment
pub const DEFAULT_FORBIDDEN_PATTERNS: &[&str] =
    &["..", "\\", "/", ":", "*", "?", "\"", "<", ">", "|"];

/// Leading segment of tag keys
pub const TAG_KEY_SEGMENT: &str = "tag";

/// Replacement for tags that sanitize to nothing
pub const UNKNOWN_TAG: &str = "unknown";

// ============================================================================
// QUERY DEFAULTS
// ============================================================================

/// Default time before a cached query becomes stale (5 minutes)
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Default absolute lifetime of a cached query (30 minutes)
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(30 * 60);

/// Default number of retries for a failing fetch
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default delay between fetch retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default lifetime of manually written query data (30 minutes)
pub const DEFAULT_MANUAL_ENTRY_TTL: Duration = Duration::from_secs(30 * 60);
