//! Cache entry priority

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative importance of a cache entry when a backend must evict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEntryPriority {
    /// First candidate for eviction
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Evicted only after low and normal entries
    High,
    /// Never evicted for capacity reasons (expiry still applies)
    NeverRemove,
}

impl CacheEntryPriority {
    /// Whether capacity-driven eviction may remove the entry
    pub fn is_evictable(self) -> bool {
        self != Self::NeverRemove
    }
}

impl fmt::Display for CacheEntryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::NeverRemove => "never_remove",
        };
        f.write_str(name)
    }
}
