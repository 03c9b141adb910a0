//! Common types for the client SDK

use crate::headers::{parse_http_date, parse_u64, unquote, HeaderTable};
use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Account summary from a `HEAD` on the storage endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    /// Number of containers
    pub container_count: u64,
    /// Bytes stored across all containers
    pub bytes_used: u64,
}

impl AccountInfo {
    pub(crate) const HEADERS: HeaderTable<Self> = &[
        ("x-account-container-count", |a: &mut Self, v: &str| {
            a.container_count = parse_u64(v).unwrap_or(0)
        }),
        ("x-account-bytes-used", |a: &mut Self, v: &str| {
            a.bytes_used = parse_u64(v).unwrap_or(0)
        }),
    ];
}

/// Container summary from a `HEAD` on the container
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Number of objects
    pub object_count: u64,
    /// Bytes stored in the container
    pub bytes_used: u64,
}

impl ContainerInfo {
    pub(crate) const HEADERS: HeaderTable<Self> = &[
        ("x-container-object-count", |c: &mut Self, v: &str| {
            c.object_count = parse_u64(v).unwrap_or(0)
        }),
        ("x-container-bytes-used", |c: &mut Self, v: &str| {
            c.bytes_used = parse_u64(v).unwrap_or(0)
        }),
    ];
}

/// Entry of a JSON container listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetail {
    /// Container name
    pub name: String,
    /// Number of objects
    pub count: u64,
    /// Bytes used
    pub bytes: u64,
}

/// Object entry of a JSON object listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDetail {
    /// Object name
    pub name: String,
    /// MD5 of the content
    pub hash: String,
    /// Size in bytes
    pub bytes: u64,
    /// Content type
    pub content_type: String,
    /// Last modified, as reported by the listing (ISO 8601 without zone)
    pub last_modified: String,
}

/// Entry of a JSON object listing: either an object or, for `path` /
/// delimiter listings, a pseudo-directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectListing {
    Object(ObjectDetail),
    Subdir { subdir: String },
}

impl ObjectListing {
    /// Name of the object or pseudo-directory
    pub fn name(&self) -> &str {
        match self {
            Self::Object(o) => &o.name,
            Self::Subdir { subdir } => subdir,
        }
    }
}

/// Object attributes from a `HEAD` (or `GET`) response
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectHead {
    /// ETag (MD5 of the content)
    pub etag: Option<String>,
    /// Last modified
    pub last_modified: Option<DateTime<Utc>>,
    /// Content type
    pub content_type: Option<String>,
    /// Content length as reported by the server
    pub content_length: Option<u64>,
    /// User metadata, keys lowercased
    pub metadata: Metadata,
}

impl ObjectHead {
    pub(crate) const HEADERS: HeaderTable<Self> = &[
        ("etag", |o: &mut Self, v: &str| o.etag = Some(unquote(v))),
        ("last-modified", |o: &mut Self, v: &str| {
            o.last_modified = parse_http_date(v)
        }),
        ("content-type", |o: &mut Self, v: &str| {
            o.content_type = Some(v.to_string())
        }),
        ("content-length", |o: &mut Self, v: &str| {
            o.content_length = parse_u64(v)
        }),
    ];

    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let mut head: Self = crate::headers::parse(headers, Self::HEADERS);
        head.metadata = Metadata::from_headers(headers);
        head
    }
}

/// Object body together with its attributes
#[derive(Clone, Debug)]
pub struct GetObjectResult {
    /// Object data
    pub data: bytes::Bytes,
    /// Attributes from the response headers
    pub head: ObjectHead,
}

/// Put object result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutObjectResult {
    /// ETag reported by the server
    pub etag: Option<String>,
    /// Content length declared by the caller; `None` for chunked uploads
    pub content_length: Option<u64>,
}

/// Pagination and filtering for listings.
///
/// A `limit` of `None` or `Some(0)` requests the full, unpaginated listing.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Maximum entries to return
    pub limit: Option<usize>,
    /// Return entries after this name
    pub marker: Option<String>,
    /// Only names starting with this prefix (objects only)
    pub prefix: Option<String>,
    /// Only direct children of this pseudo-directory (objects only)
    pub path: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after `marker`
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Filter by prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// List one pseudo-directory level
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Query parameters for this listing; reqwest percent-encodes them
    pub(crate) fn query(&self, json: bool) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if json {
            query.push(("format", "json".to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        if let Some(marker) = &self.marker {
            query.push(("marker", marker.clone()));
        }
        if let Some(prefix) = &self.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if let Some(path) = &self.path {
            query.push(("path", path.clone()));
        }
        query
    }
}

/// Extra request headers for object downloads (e.g. `Range`, `If-Match`)
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    pub headers: HeaderMap,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a byte range, inclusive on both ends
    pub fn with_range(mut self, start: u64, end: Option<u64>) -> Self {
        let range = match end {
            Some(end) => format!("bytes={}-{}", start, end),
            None => format!("bytes={}-", start),
        };
        if let Ok(value) = range.parse() {
            self.headers.insert(reqwest::header::RANGE, value);
        }
        self
    }
}

/// Options for object uploads
#[derive(Clone, Debug, Default)]
pub struct PutOptions {
    /// User metadata
    pub metadata: Metadata,
    /// Content type; guessed from the object name when absent
    pub content_type: Option<String>,
    /// Expected MD5 (hex); computed automatically for in-memory bodies
    pub etag: Option<String>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_zero_limit_is_unpaginated() {
        let query = ListOptions::new().with_limit(0).query(false);
        assert!(query.iter().all(|(k, _)| *k != "limit"));

        let query = ListOptions::new().with_limit(10).with_marker("b").query(true);
        assert_eq!(
            query,
            vec![
                ("format", "json".to_string()),
                ("limit", "10".to_string()),
                ("marker", "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_object_head_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("etag", HeaderValue::from_static("\"d41d8cd98f00b204e9800998ecf8427e\""));
        headers.insert("last-modified", HeaderValue::from_static("Tue, 01 Oct 2024 12:00:00 GMT"));
        headers.insert("content-type", HeaderValue::from_static("image/png"));
        headers.insert("content-length", HeaderValue::from_static("512"));
        headers.insert("x-object-meta-camera", HeaderValue::from_static("x100"));

        let head = ObjectHead::from_headers(&headers);
        assert_eq!(head.etag.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e"));
        assert_eq!(head.content_type.as_deref(), Some("image/png"));
        assert_eq!(head.content_length, Some(512));
        assert!(head.last_modified.is_some());
        assert_eq!(head.metadata.get("Camera"), Some("x100"));
    }

    #[test]
    fn test_listing_entries() {
        let json = r#"[
            {"subdir": "photos/2024/"},
            {"name": "photos/cover.jpg", "hash": "abc", "bytes": 10,
             "content_type": "image/jpeg", "last_modified": "2024-10-01T12:00:00.000000"}
        ]"#;
        let entries: Vec<ObjectListing> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].name(), "photos/2024/");
        assert!(matches!(&entries[1], ObjectListing::Object(o) if o.bytes == 10));
    }

    #[test]
    fn test_range_header() {
        let opts = GetOptions::new().with_range(10, Some(19));
        assert_eq!(opts.headers.get("range").unwrap(), "bytes=10-19");
    }
}
