//! Glob patterns over cache keys
//!
//! Only two wildcards are recognised: `*` (any run of characters, possibly
//! empty) and `?` (exactly one character). Everything else is literal and the
//! match is anchored at both ends of the key.

use crate::error::{CacheError, Result};
use regex::Regex;

/// A compiled key pattern
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compile a glob pattern
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidPattern`] if the translated expression
    /// exceeds the regex engine's size limits.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?s)^");
        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|source| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether `key` matches the whole pattern
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob this pattern was compiled from
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Escape glob metacharacters so `literal` matches only itself in a store-side
/// `MATCH` pattern.
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub(crate) fn escape_glob(literal: &str) -> String {
    escape_chars(literal, &['*', '?', '[', ']', '\\'])
}

/// Rewrite a key pattern for a store whose glob dialect also knows `[...]`
/// classes and backslash escapes, keeping only `*` and `?` as wildcards.
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
pub(crate) fn to_store_glob(pattern: &str) -> String {
    escape_chars(pattern, &['[', ']', '\\'])
}

fn escape_chars(input: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if special.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_any_run() {
        let pattern = KeyPattern::new("user:*").unwrap();
        assert!(pattern.matches("user:1"));
        assert!(pattern.matches("user:"));
        assert!(pattern.matches("user:1:profile"));
        assert!(!pattern.matches("order:1"));
        assert!(!pattern.matches("xuser:1"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let pattern = KeyPattern::new("item:?").unwrap();
        assert!(pattern.matches("item:a"));
        assert!(!pattern.matches("item:"));
        assert!(!pattern.matches("item:ab"));
    }

    #[test]
    fn test_anchored_at_both_ends() {
        let pattern = KeyPattern::new("session").unwrap();
        assert!(pattern.matches("session"));
        assert!(!pattern.matches("session:1"));
        assert!(!pattern.matches("old-session"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = KeyPattern::new("a.b+(c)[d]|*").unwrap();
        assert!(pattern.matches("a.b+(c)[d]|tail"));
        assert!(!pattern.matches("axb+(c)[d]|tail"));
    }

    #[test]
    fn test_star_spans_newlines() {
        let pattern = KeyPattern::new("multi*").unwrap();
        assert!(pattern.matches("multi\nline"));
    }

    #[test]
    fn test_to_store_glob_keeps_wildcards() {
        assert_eq!(to_store_glob("user:*"), "user:*");
        assert_eq!(to_store_glob("a?[b]\\"), "a?\\[b\\]\\\\");
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("app:v1"), "app:v1");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }
}
