//! Credentials and the session produced by authentication

use crate::config::{Config, DEFAULT_AUTH_HOST};
use crate::headers::{self, HeaderTable};
use crate::{CloudFilesError, Result};
use reqwest::header::HeaderMap;
use std::fmt;

pub(crate) const AUTH_USER_HEADER: &str = "X-Auth-User";
pub(crate) const AUTH_KEY_HEADER: &str = "X-Auth-Key";
pub(crate) const AUTH_USER_HEADER_LEGACY: &str = "X-Storage-User";
pub(crate) const AUTH_KEY_HEADER_LEGACY: &str = "X-Storage-Pass";
pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Account credentials
#[derive(Clone)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// API key or password
    pub api_key: String,
    /// Account name; selects the legacy account-scoped auth endpoint
    pub account: Option<String>,
    /// Auth host override
    pub auth_host: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
            account: None,
            auth_host: None,
        }
    }

    /// Authenticate against `{host}/v{version}/{account}/auth`
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Override the authentication host
    pub fn with_auth_host(mut self, host: impl Into<String>) -> Self {
        self.auth_host = Some(host.into());
        self
    }

    /// Auth URL and the pair of header names carrying user and key
    pub(crate) fn endpoint(&self, config: &Config) -> (String, &'static str, &'static str) {
        let host = self
            .auth_host
            .as_deref()
            .map(|h| h.trim_end_matches('/'));
        match (&self.account, host) {
            (Some(account), host) => (
                format!(
                    "{}/v{}/{}/auth",
                    host.unwrap_or(DEFAULT_AUTH_HOST),
                    config.api_version,
                    urlencoding::encode(account)
                ),
                AUTH_USER_HEADER_LEGACY,
                AUTH_KEY_HEADER_LEGACY,
            ),
            (None, Some(host)) => (
                format!("{}/v1.0", host),
                AUTH_USER_HEADER,
                AUTH_KEY_HEADER,
            ),
            (None, None) => (config.auth_url.clone(), AUTH_USER_HEADER, AUTH_KEY_HEADER),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("account", &self.account)
            .field("auth_host", &self.auth_host)
            .finish()
    }
}

/// Endpoints and token obtained from authentication
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Base URL for account, container and object operations
    pub storage_url: String,
    /// Base URL for CDN management, when the account has CDN access
    pub cdn_management_url: Option<String>,
    /// Token sent as `X-Auth-Token`
    pub auth_token: String,
}

#[derive(Default)]
struct AuthHeaders {
    storage_url: Option<String>,
    cdn_management_url: Option<String>,
    auth_token: Option<String>,
    storage_token: Option<String>,
}

const AUTH_RESPONSE_HEADERS: HeaderTable<AuthHeaders> = &[
    ("x-storage-url", |a: &mut AuthHeaders, v: &str| {
        a.storage_url = Some(v.to_string())
    }),
    ("x-cdn-management-url", |a: &mut AuthHeaders, v: &str| {
        a.cdn_management_url = Some(v.to_string())
    }),
    ("x-auth-token", |a: &mut AuthHeaders, v: &str| {
        a.auth_token = Some(v.to_string())
    }),
    ("x-storage-token", |a: &mut AuthHeaders, v: &str| {
        a.storage_token = Some(v.to_string())
    }),
];

impl Session {
    /// Build a session from previously obtained values
    pub fn new(storage_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            cdn_management_url: None,
            auth_token: auth_token.into(),
        }
    }

    pub fn with_cdn_management_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_management_url = Some(url.into());
        self
    }

    /// Extract a session from the headers of a successful auth response
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let parsed: AuthHeaders = headers::parse(headers, AUTH_RESPONSE_HEADERS);

        let storage_url = parsed
            .storage_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| missing_header("X-Storage-Url"))?;
        url::Url::parse(&storage_url).map_err(|e| CloudFilesError::Authentication {
            status: None,
            message: format!("invalid storage URL '{}': {}", storage_url, e),
        })?;

        let auth_token = parsed
            .auth_token
            .or(parsed.storage_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing_header("X-Auth-Token"))?;

        Ok(Self {
            storage_url: storage_url.trim_end_matches('/').to_string(),
            cdn_management_url: parsed
                .cdn_management_url
                .filter(|u| !u.is_empty())
                .map(|u| u.trim_end_matches('/').to_string()),
            auth_token,
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("storage_url", &self.storage_url)
            .field("cdn_management_url", &self.cdn_management_url)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

fn missing_header(name: &str) -> CloudFilesError {
    CloudFilesError::Authentication {
        status: None,
        message: format!("auth response is missing {}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_endpoint_selection() {
        let config = Config::new("https://auth.example.com/v1.0");

        let (url, user, _) = Credentials::new("u", "k").endpoint(&config);
        assert_eq!(url, "https://auth.example.com/v1.0");
        assert_eq!(user, AUTH_USER_HEADER);

        let (url, user, key) = Credentials::new("u", "k")
            .with_account("acme corp")
            .with_auth_host("https://legacy.example.com/")
            .endpoint(&config);
        assert_eq!(url, "https://legacy.example.com/v1/acme%20corp/auth");
        assert_eq!(user, AUTH_USER_HEADER_LEGACY);
        assert_eq!(key, AUTH_KEY_HEADER_LEGACY);

        let (url, _, _) = Credentials::new("u", "k").with_account("acme").endpoint(&config);
        assert_eq!(url, format!("{}/v1/acme/auth", DEFAULT_AUTH_HOST));

        let (url, user, _) = Credentials::new("u", "k")
            .with_auth_host("https://other.example.com")
            .endpoint(&config);
        assert_eq!(url, "https://other.example.com/v1.0");
        assert_eq!(user, AUTH_USER_HEADER);
    }

    #[test]
    fn test_session_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-storage-url",
            HeaderValue::from_static("https://storage.example.com/v1/AUTH_x/"),
        );
        headers.insert(
            "x-cdn-management-url",
            HeaderValue::from_static("https://cdn.example.com/v1/AUTH_x"),
        );
        headers.insert("x-storage-token", HeaderValue::from_static("legacy-token"));

        let session = Session::from_headers(&headers).unwrap();
        assert_eq!(session.storage_url, "https://storage.example.com/v1/AUTH_x");
        assert_eq!(
            session.cdn_management_url.as_deref(),
            Some("https://cdn.example.com/v1/AUTH_x")
        );
        assert_eq!(session.auth_token, "legacy-token");

        headers.insert("x-auth-token", HeaderValue::from_static("modern-token"));
        assert_eq!(Session::from_headers(&headers).unwrap().auth_token, "modern-token");
    }

    #[test]
    fn test_session_requires_url_and_token() {
        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", HeaderValue::from_static("t"));
        assert!(matches!(
            Session::from_headers(&headers),
            Err(CloudFilesError::Authentication { .. })
        ));

        let mut headers = HeaderMap::new();
        headers.insert("x-storage-url", HeaderValue::from_static("https://s.example.com"));
        assert!(Session::from_headers(&headers).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("alice", "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));
        let session = Session::new("https://s.example.com", "tok123");
        assert!(!format!("{:?}", session).contains("tok123"));
    }
}
