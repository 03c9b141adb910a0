//! User metadata carried in `X-Object-Meta-*` headers

use crate::{CloudFilesError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

/// Header-name prefix for user metadata
pub const META_HEADER_PREFIX: &str = "X-Object-Meta-";

/// Maximum metadata key length
pub const MAX_META_KEY_LEN: usize = 128;

/// Maximum metadata value length
pub const MAX_META_VALUE_LEN: usize = 256;

/// Object metadata.
///
/// Keys are case-insensitive and stored lowercased, which is also how the
/// service reports them back. Inserting a key that differs only in case
/// replaces the earlier value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, String>,
}

impl Metadata {
    /// Create new empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert an entry, returning the previous value for the key
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(key.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Look up a value, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (lowercased key, value) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check every entry against the size and character rules
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.entries {
            if key.is_empty() {
                return Err(CloudFilesError::Validation(
                    "metadata key must not be empty".to_string(),
                ));
            }
            if key.chars().count() > MAX_META_KEY_LEN {
                return Err(CloudFilesError::Validation(format!(
                    "metadata key exceeds {} characters: {}",
                    MAX_META_KEY_LEN, key
                )));
            }
            if value.chars().count() > MAX_META_VALUE_LEN {
                return Err(CloudFilesError::Validation(format!(
                    "metadata value for '{}' exceeds {} characters",
                    key, MAX_META_VALUE_LEN
                )));
            }
            if value.trim() != value {
                return Err(CloudFilesError::Validation(format!(
                    "metadata value for '{}' has leading or trailing whitespace",
                    key
                )));
            }
            if key.contains(':') || value.contains(':') {
                return Err(CloudFilesError::Validation(format!(
                    "metadata entry '{}' contains ':'",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Validate and write every entry as an `X-Object-Meta-<key>` header
    pub(crate) fn write_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        self.validate()?;
        for (key, value) in &self.entries {
            let name = HeaderName::from_bytes(format!("{}{}", META_HEADER_PREFIX, key).as_bytes())
                .map_err(|_| {
                    CloudFilesError::Validation(format!("invalid metadata key: {}", key))
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                CloudFilesError::Validation(format!("invalid metadata value for '{}'", key))
            })?;
            headers.insert(name, value);
        }
        Ok(())
    }

    /// Rebuild metadata from the `X-Object-Meta-*` headers of a response
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let prefix = META_HEADER_PREFIX.to_ascii_lowercase();
        let mut metadata = Self::new();
        for (name, value) in headers {
            if let Some(key) = name.as_str().strip_prefix(prefix.as_str()) {
                if let Ok(v) = std::str::from_utf8(value.as_bytes()) {
                    metadata.insert(key, v);
                }
            }
        }
        metadata
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut meta = Metadata::new().with("Author", "alice");
        assert_eq!(meta.get("author"), Some("alice"));
        assert_eq!(meta.get("AUTHOR"), Some("alice"));

        let previous = meta.insert("AUTHOR", "bob");
        assert_eq!(previous.as_deref(), Some("alice"));
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("author"), Some("bob"));
    }

    #[test]
    fn test_rejects_colons() {
        let meta = Metadata::new().with("time", "12:30");
        assert!(meta.validate().unwrap_err().is_validation());

        let meta = Metadata::new().with("a:b", "x");
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_length_limits() {
        let ok = Metadata::new()
            .with("k".repeat(MAX_META_KEY_LEN), "v".repeat(MAX_META_VALUE_LEN));
        assert!(ok.validate().is_ok());

        let long_key = Metadata::new().with("k".repeat(MAX_META_KEY_LEN + 1), "v");
        assert!(long_key.validate().is_err());

        let long_value = Metadata::new().with("k", "v".repeat(MAX_META_VALUE_LEN + 1));
        assert!(long_value.validate().is_err());
    }

    #[test]
    fn test_header_round_trip() {
        let meta: Metadata = [("Color", "blue"), ("Owner-Id", "42")].into_iter().collect();

        let mut headers = HeaderMap::new();
        meta.write_headers(&mut headers).unwrap();
        assert_eq!(headers.get("x-object-meta-color").unwrap(), "blue");
        assert_eq!(headers.get("x-object-meta-owner-id").unwrap(), "42");

        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        assert_eq!(Metadata::from_headers(&headers), meta);
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let meta = Metadata::new().with("city", "Zürich").with("note", "naïve café");

        let mut headers = HeaderMap::new();
        meta.write_headers(&mut headers).unwrap();
        assert_eq!(Metadata::from_headers(&headers), meta);
    }

    #[test]
    fn test_rejects_surrounding_whitespace() {
        for value in [" x", "x ", " x ", "\tx"] {
            let meta = Metadata::new().with("pad", value);
            assert!(meta.validate().unwrap_err().is_validation(), "{:?}", value);
        }
        assert!(Metadata::new().with("pad", "a b").validate().is_ok());
    }

    #[test]
    fn test_invalid_header_key() {
        let meta = Metadata::new().with("has space", "x");
        let mut headers = HeaderMap::new();
        assert!(meta.write_headers(&mut headers).unwrap_err().is_validation());
    }
}
