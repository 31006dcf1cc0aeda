//! Key Generator Port
//!
//! Turns composite query keys into canonical cache keys. Canonicalization
//! must be injective for valid keys, so every segment is validated against
//! the separator and the other forbidden patterns before joining.

use crate::constants::{TAG_KEY_SEGMENT, UNKNOWN_TAG};
use crate::error::{Error, Result};
use crate::value_objects::QueryKey;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

static INJECTION_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)select\s.+from",
        r"(?i)insert\s.+into",
        r"(?i)update\s.+set",
        r"(?i)delete\s.+from",
        r"(?i)drop\s.+table",
        r"(?i)exec(\s|\()",
        r"(?i)execute\s",
        r"(?i)union\s.+select",
        r"(?i);\s*--",
        r"(?i)/\*.*\*/",
    ])
    .unwrap_or_else(|_| RegexSet::empty())
});

static INVALID_TAG_CHARS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[^\w\-\.]").ok());

/// Best-effort heuristic for injection-like input
///
/// Not a security boundary; it only keeps obviously hostile strings out of
/// backend key namespaces.
pub fn contains_potential_injection(input: &str) -> bool {
    !input.is_empty() && INJECTION_PATTERNS.is_match(input)
}

/// First character of a multi-character `separator` found in `part`
///
/// A segment holding only part of the separator could merge with its
/// neighbour across the join, so every character is reserved.
fn separator_char_in(part: &str, separator: &str) -> Option<char> {
    if separator.chars().nth(1).is_none() {
        return None;
    }
    part.chars().find(|c| separator.contains(*c))
}

/// Key Generator Port
///
/// Implementors supply the separator, length limit and forbidden patterns;
/// validation, canonicalization and tag keys have default implementations.
///
/// # Example
///
/// ```
/// use revalid_domain::ports::KeyGenerator;
/// use revalid_domain::{DefaultKeyGenerator, QueryKey};
///
/// let keys = DefaultKeyGenerator::default();
/// assert_eq!(keys.generate(&QueryKey::from(["todos", "42"])).unwrap(), "todos:42");
/// assert!(keys.generate(&QueryKey::from(["a:b"])).is_err());
/// assert_eq!(keys.tag_key("User List"), "tag:user_list");
/// ```
pub trait KeyGenerator: Send + Sync + std::fmt::Debug {
    /// Separator placed between segments
    fn separator(&self) -> &str;

    /// Maximum length of a canonical key
    fn max_key_length(&self) -> usize;

    /// Substrings no segment may contain (includes the separator)
    ///
    /// Each character of a multi-character separator is rejected as well.
    fn forbidden_patterns(&self) -> &[String];

    /// Join segments without validation
    fn join(&self, parts: &[String]) -> String {
        parts.join(self.separator())
    }

    /// Every validation message for `parts`, empty when valid
    fn validate(&self, parts: &[String]) -> Vec<String> {
        if parts.is_empty() {
            return vec!["Key parts cannot be empty".to_string()];
        }

        let max_part = self.max_key_length() / 2;
        let mut errors = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            if part.trim().is_empty() {
                errors.push(format!("Key part at index {index} cannot be empty"));
                continue;
            }
            if part.chars().count() > max_part {
                errors.push(format!(
                    "Key part '{part}' exceeds maximum length of {max_part} characters"
                ));
            }
            for pattern in self.forbidden_patterns() {
                if part.contains(pattern.as_str()) {
                    errors.push(format!(
                        "Key part '{part}' contains forbidden pattern '{pattern}'"
                    ));
                }
            }
            if let Some(c) = separator_char_in(part, self.separator()) {
                errors.push(format!(
                    "Key part '{part}' contains separator character '{c}'"
                ));
            }
            if contains_potential_injection(part) {
                errors.push(format!("Key part '{part}' contains potential injection pattern"));
            }
        }

        let length = self.join(parts).chars().count();
        if length > self.max_key_length() {
            errors.push(format!(
                "Generated key exceeds maximum length of {} characters",
                self.max_key_length()
            ));
        }
        errors
    }

    /// Canonical key, failing on the first validation error
    fn generate(&self, key: &QueryKey) -> Result<String> {
        let mut errors = self.validate(key.parts());
        if errors.is_empty() {
            return Ok(self.join(key.parts()));
        }
        errors.truncate(1);
        Err(Error::invalid_key(key.parts(), errors))
    }

    /// Canonical key, reporting every validation error at once
    fn generate_or_fail(&self, key: &QueryKey) -> Result<String> {
        let errors = self.validate(key.parts());
        if errors.is_empty() {
            Ok(self.join(key.parts()))
        } else {
            Err(Error::invalid_key(key.parts(), errors))
        }
    }

    /// Fold a free-form tag into the key alphabet
    fn sanitize_tag(&self, tag: &str) -> String {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return UNKNOWN_TAG.to_string();
        }
        let replaced = match INVALID_TAG_CHARS.as_ref() {
            Some(regex) => regex.replace_all(trimmed, "_").into_owned(),
            None => trimmed.to_string(),
        };
        let separator = self.separator();
        let multi_char = separator.chars().nth(1).is_some();
        let sanitized = replaced
            .replace(separator, "_")
            .chars()
            .map(|c| if multi_char && separator.contains(c) { '_' } else { c })
            .collect::<String>()
            .to_lowercase();
        if sanitized.is_empty() {
            UNKNOWN_TAG.to_string()
        } else {
            sanitized
        }
    }

    /// Canonical key used as the invalidation unit for `tag`
    fn tag_key(&self, tag: &str) -> String {
        format!("{TAG_KEY_SEGMENT}{}{}", self.separator(), self.sanitize_tag(tag))
    }
}
