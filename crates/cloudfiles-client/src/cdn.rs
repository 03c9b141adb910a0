//! CDN publishing operations
//!
//! These calls go to the CDN management endpoint from the session, which is
//! independent of the storage endpoint.

use crate::client::{read_json_listing, read_name_listing};
use crate::headers::{self, parse_bool, parse_u64, HeaderTable};
use crate::path::{container_path, encode_segment, validate_object_name};
use crate::{CloudFilesError, Result, StorageClient};
use reqwest::{header, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Default CDN cache TTL in seconds (one day)
pub const DEFAULT_CDN_TTL: u32 = 86_400;
/// Shortest TTL the service accepts
pub const MIN_CDN_TTL: u32 = 900;
/// Longest TTL the service accepts (one year)
pub const MAX_CDN_TTL: u32 = 31_536_000;

const CDN_ENABLED_HEADER: &str = "X-CDN-Enabled";
const TTL_HEADER: &str = "X-TTL";
const LOG_RETENTION_HEADER: &str = "X-Log-Retention";
const PURGE_EMAIL_HEADER: &str = "X-Purge-Email";

/// CDN settings of a container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnContainer {
    /// Container name
    #[serde(default)]
    pub name: String,
    /// Whether the container is currently published
    #[serde(rename = "cdn_enabled", default)]
    pub enabled: bool,
    /// Cache TTL in seconds
    #[serde(default)]
    pub ttl: u64,
    /// Public URI
    #[serde(rename = "cdn_uri", default)]
    pub uri: Option<String>,
    /// Public HTTPS URI
    #[serde(rename = "cdn_ssl_uri", default)]
    pub ssl_uri: Option<String>,
    /// Whether CDN access logs are kept
    #[serde(default)]
    pub log_retention: bool,
}

impl CdnContainer {
    pub(crate) const HEADERS: HeaderTable<Self> = &[
        ("x-cdn-enabled", |c: &mut Self, v: &str| c.enabled = parse_bool(v)),
        ("x-ttl", |c: &mut Self, v: &str| c.ttl = parse_u64(v).unwrap_or(0)),
        ("x-cdn-uri", |c: &mut Self, v: &str| c.uri = Some(v.to_string())),
        ("x-cdn-ssl-uri", |c: &mut Self, v: &str| {
            c.ssl_uri = Some(v.to_string())
        }),
        ("x-log-retention", |c: &mut Self, v: &str| {
            c.log_retention = parse_bool(v)
        }),
    ];
}

/// Changes applied by [`StorageClient::update_cdn`]
#[derive(Clone, Debug, Default)]
pub struct CdnUpdate {
    pub ttl: Option<u32>,
    pub enabled: Option<bool>,
    pub log_retention: Option<bool>,
}

impl CdnUpdate {
    fn is_empty(&self) -> bool {
        self.ttl.is_none() && self.enabled.is_none() && self.log_retention.is_none()
    }
}

fn validate_ttl(ttl: u32) -> Result<()> {
    if !(MIN_CDN_TTL..=MAX_CDN_TTL).contains(&ttl) {
        return Err(CloudFilesError::Validation(format!(
            "CDN TTL must be between {} and {} seconds, got {}",
            MIN_CDN_TTL, MAX_CDN_TTL, ttl
        )));
    }
    Ok(())
}

fn flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl StorageClient {
    /// List names of containers known to the CDN
    #[instrument(skip(self))]
    pub async fn list_cdn_containers(&self, enabled_only: bool) -> Result<Vec<String>> {
        let mut req = self.cdn_request(Method::GET, "")?;
        if enabled_only {
            req = req.query(&[("enabled_only", "true")]);
        }
        let response = self.send(req, "CDN account").await?;
        read_name_listing(response).await
    }

    /// List CDN settings of every container known to the CDN
    #[instrument(skip(self))]
    pub async fn list_cdn_container_details(&self) -> Result<Vec<CdnContainer>> {
        let req = self
            .cdn_request(Method::GET, "")?
            .query(&[("format", "json")]);
        let response = self.send(req, "CDN account").await?;
        read_json_listing(response).await
    }

    /// Publish a container, returning its public URI when the service
    /// reports one
    #[instrument(skip(self))]
    pub async fn enable_cdn(&self, name: &str, ttl: Option<u32>) -> Result<Option<String>> {
        let ttl = ttl.unwrap_or(DEFAULT_CDN_TTL);
        validate_ttl(ttl)?;
        let req = self
            .cdn_request(Method::PUT, &container_path(name)?)?
            .header(TTL_HEADER, ttl)
            .header(CDN_ENABLED_HEADER, flag(true))
            .header(header::CONTENT_LENGTH, 0);
        let response = self.send(req, name).await?;
        let cdn: CdnContainer = headers::parse(response.headers(), CdnContainer::HEADERS);
        Ok(cdn.uri)
    }

    /// Change TTL, enabled flag or log retention of a published container
    #[instrument(skip(self))]
    pub async fn update_cdn(&self, name: &str, update: &CdnUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(CloudFilesError::Validation(
                "CDN update requires at least one setting".to_string(),
            ));
        }
        if let Some(ttl) = update.ttl {
            validate_ttl(ttl)?;
        }
        let mut req = self
            .cdn_request(Method::POST, &container_path(name)?)?
            .header(header::CONTENT_LENGTH, 0);
        if let Some(ttl) = update.ttl {
            req = req.header(TTL_HEADER, ttl);
        }
        if let Some(enabled) = update.enabled {
            req = req.header(CDN_ENABLED_HEADER, flag(enabled));
        }
        if let Some(retain) = update.log_retention {
            req = req.header(LOG_RETENTION_HEADER, flag(retain));
        }
        self.send(req, name).await?;
        Ok(())
    }

    /// Stop publishing a container. Its CDN settings are kept.
    #[instrument(skip(self))]
    pub async fn disable_cdn(&self, name: &str) -> Result<()> {
        self.update_cdn(
            name,
            &CdnUpdate {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// CDN settings of one container. `NotFound` if it was never published.
    #[instrument(skip(self))]
    pub async fn head_cdn_container(&self, name: &str) -> Result<CdnContainer> {
        let req = self.cdn_request(Method::HEAD, &container_path(name)?)?;
        let response = self.send(req, name).await?;
        let mut cdn: CdnContainer = headers::parse(response.headers(), CdnContainer::HEADERS);
        cdn.name = name.to_string();
        Ok(cdn)
    }

    /// Evict a container, or a single object of it, from the CDN edge caches
    #[instrument(skip(self))]
    pub async fn purge_from_cdn(
        &self,
        container: &str,
        object: Option<&str>,
        notify_email: Option<&str>,
    ) -> Result<()> {
        let mut path = container_path(container)?;
        if let Some(object) = object {
            validate_object_name(object)?;
            path.push('/');
            path.push_str(&encode_segment(object));
        }
        let mut req = self.cdn_request(Method::DELETE, &path)?;
        if let Some(email) = notify_email {
            req = req.header(PURGE_EMAIL_HEADER, email);
        }
        self.send(req, &path).await?;
        Ok(())
    }

    fn cdn_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let base = self
            .session_or_err()?
            .cdn_management_url
            .as_deref()
            .ok_or_else(|| CloudFilesError::Authentication {
                status: None,
                message: "session has no CDN management endpoint".to_string(),
            })?;
        self.endpoint_request(method, base, path)
    }
}
