//! Key canonicalization configuration

use revalid_domain::DefaultKeyGenerator;
use revalid_domain::constants::{DEFAULT_KEY_SEPARATOR, DEFAULT_MAX_KEY_LENGTH};
use revalid_domain::error::Result;
use serde::{Deserialize, Serialize};

/// Key generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Separator joining key segments
    pub separator: String,

    /// Maximum length of a canonical key
    pub max_key_length: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_KEY_SEPARATOR.to_string(),
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl KeysConfig {
    /// Key generator for this section
    pub fn to_generator(&self) -> Result<DefaultKeyGenerator> {
        DefaultKeyGenerator::new(self.separator.as_str(), self.max_key_length)
    }
}
