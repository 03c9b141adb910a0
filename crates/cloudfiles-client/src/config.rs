//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default authentication endpoint for the modern (`X-Auth-User`) flow
pub const DEFAULT_AUTH_URL: &str = "https://auth.api.rackspacecloud.com/v1.0";

/// Default host for the legacy account-scoped authentication flow
pub const DEFAULT_AUTH_HOST: &str = "https://auth.api.rackspacecloud.com";

/// Default API version used in legacy auth paths (`/v{version}/{account}/auth`)
pub const DEFAULT_API_VERSION: u32 = 1;

/// Maximum number of redirects followed while authenticating
pub const MAX_AUTH_REDIRECTS: usize = 4;

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Authentication endpoint used when no account/host override is given
    pub auth_url: String,
    /// API version for legacy account-scoped authentication
    pub api_version: u32,
    /// User agent string
    pub user_agent: String,
    /// Request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// Verify server TLS certificates
    pub verify_tls: bool,
    /// PEM file with additional trusted CA certificates
    pub ca_bundle: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_version: DEFAULT_API_VERSION,
            user_agent: format!("cloudfiles-client/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
            verify_tls: true,
            ca_bundle: None,
        }
    }
}

impl Config {
    /// Create a new config with the given authentication URL
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            ..Default::default()
        }
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Trust the CA certificates in the given PEM bundle
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Disable TLS certificate verification (development only)
    pub fn danger_disable_tls_verification(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Set the API version for legacy authentication
    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = Config::new("https://auth.example.com/v1.0")
            .with_timeout(Duration::from_secs(5))
            .with_ca_bundle("/etc/ssl/ca.pem")
            .with_api_version(2);

        assert_eq!(config.auth_url, "https://auth.example.com/v1.0");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/etc/ssl/ca.pem")));
        assert_eq!(config.api_version, 2);
        assert!(config.verify_tls);
        assert!(config.user_agent.starts_with("cloudfiles-client/"));
    }
}
