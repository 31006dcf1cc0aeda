//! Default key generator

use crate::constants::{DEFAULT_FORBIDDEN_PATTERNS, DEFAULT_KEY_SEPARATOR, DEFAULT_MAX_KEY_LENGTH};
use crate::error::{Error, Result};
use crate::ports::KeyGenerator;

/// Key generator with a configurable separator and length limit
///
/// The separator is always part of the forbidden patterns, so no valid
/// segment can contain it and canonical keys never collide.
#[derive(Debug, Clone)]
pub struct DefaultKeyGenerator {
    separator: String,
    max_key_length: usize,
    forbidden_patterns: Vec<String>,
}

impl DefaultKeyGenerator {
    /// Generator with a custom separator and maximum key length
    pub fn new<S: Into<String>>(separator: S, max_key_length: usize) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(Error::invalid_argument("key separator cannot be empty"));
        }
        if max_key_length < 2 {
            return Err(Error::invalid_argument(format!(
                "max key length must be at least 2, got {max_key_length}"
            )));
        }
        let patterns = DEFAULT_FORBIDDEN_PATTERNS.iter().map(|p| (*p).to_string());
        Ok(Self {
            forbidden_patterns: with_separator(patterns.collect(), &separator),
            separator,
            max_key_length,
        })
    }

    /// Replace the forbidden patterns (the separator stays forbidden)
    pub fn with_forbidden_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns.into_iter().map(Into::into).collect();
        self.forbidden_patterns = with_separator(patterns, &self.separator);
        self
    }
}

fn with_separator(mut patterns: Vec<String>, separator: &str) -> Vec<String> {
    patterns.retain(|p| !p.is_empty());
    if !patterns.iter().any(|p| p == separator) {
        patterns.push(separator.to_string());
    }
    patterns
}

impl Default for DefaultKeyGenerator {
    fn default() -> Self {
        let patterns = DEFAULT_FORBIDDEN_PATTERNS.iter().map(|p| (*p).to_string());
        Self {
            separator: DEFAULT_KEY_SEPARATOR.to_string(),
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            forbidden_patterns: with_separator(patterns.collect(), DEFAULT_KEY_SEPARATOR),
        }
    }
}

impl KeyGenerator for DefaultKeyGenerator {
    fn separator(&self) -> &str {
        &self.separator
    }

    fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    fn forbidden_patterns(&self) -> &[String] {
        &self.forbidden_patterns
    }
}
