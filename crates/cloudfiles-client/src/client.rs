//! Main client implementation

use crate::{
    auth::{Credentials, Session, AUTH_TOKEN_HEADER},
    config::MAX_AUTH_REDIRECTS,
    headers,
    metadata::Metadata,
    path::{container_path, object_path},
    transfer::{ObjectSource, ProgressCallback, TransferProgress},
    types::*,
    CloudFilesError, Config, Result,
};
use bytes::Bytes;
use md5::{Digest, Md5};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    redirect, Certificate, Client, Method, RequestBuilder, Response, StatusCode,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

const COPY_FROM_HEADER: &str = "X-Copy-From";

/// Upper bound on the buffer reserved up front from `Content-Length`
const MAX_PREALLOCATION: usize = 8 << 20;

/// Cloud Files storage client.
///
/// Holds one HTTP client for storage and CDN requests and one for
/// authentication; both keep their connections alive between calls. A
/// client is not meant to be shared across tasks without external locking.
pub struct StorageClient {
    config: Config,
    http: Client,
    auth_http: Client,
    session: Option<Session>,
    read_progress: Option<ProgressCallback>,
    write_progress: Option<ProgressCallback>,
}

impl StorageClient {
    /// Create a new, unauthenticated client
    pub fn new(config: Config) -> Result<Self> {
        let ca_cert = match &config.ca_bundle {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    CloudFilesError::Config(format!(
                        "cannot read CA bundle {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    CloudFilesError::Config(format!("invalid CA bundle {}: {}", path.display(), e))
                })?;
                Some(cert)
            }
            None => None,
        };

        let http = build_http(&config, redirect::Policy::none(), ca_cert.clone())?;
        let auth_http = build_http(
            &config,
            redirect::Policy::limited(MAX_AUTH_REDIRECTS),
            ca_cert,
        )?;

        Ok(Self {
            config,
            http,
            auth_http,
            session: None,
            read_progress: None,
            write_progress: None,
        })
    }

    /// Create a client that reuses a session obtained earlier
    pub fn with_session(config: Config, session: Session) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.session = Some(session);
        Ok(client)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current session, if authenticated
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Callback invoked for every chunk of an upload body that is sent
    pub fn set_read_progress(&mut self, callback: Option<ProgressCallback>) {
        self.read_progress = callback;
    }

    /// Callback invoked for every chunk of a download body that is received
    pub fn set_write_progress(&mut self, callback: Option<ProgressCallback>) {
        self.write_progress = callback;
    }

    // ==================== Authentication ====================

    /// Authenticate and store the resulting session.
    ///
    /// A failed attempt clears any previous session. There is no retry.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<Session> {
        if credentials.username.is_empty() || credentials.api_key.is_empty() {
            return Err(CloudFilesError::Validation(
                "username and API key are required".to_string(),
            ));
        }
        self.session = None;

        let (url, user_header, key_header) = credentials.endpoint(&self.config);
        debug!("Authenticating against {}", url);

        let response = self
            .auth_http
            .post(&url)
            .header(user_header, credentials.username.as_str())
            .header(key_header, credentials.api_key.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Authentication rejected");
            return Err(CloudFilesError::Authentication {
                status: Some(status.as_u16()),
                message: format!(
                    "authentication failed: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            });
        }

        let session = Session::from_headers(response.headers())?;
        info!(storage_url = %session.storage_url, "Authenticated");
        self.session = Some(session.clone());
        Ok(session)
    }

    // ==================== Account Operations ====================

    /// Container count and bytes used for the account
    #[instrument(skip(self))]
    pub async fn head_account(&self) -> Result<AccountInfo> {
        let req = self.storage_request(Method::HEAD, "")?;
        let response = self.send(req, "account").await?;
        Ok(headers::parse(response.headers(), AccountInfo::HEADERS))
    }

    /// List container names
    #[instrument(skip(self))]
    pub async fn list_containers(&self, options: &ListOptions) -> Result<Vec<String>> {
        let req = self
            .storage_request(Method::GET, "")?
            .query(&options.query(false));
        let response = self.send(req, "account").await?;
        read_name_listing(response).await
    }

    /// List containers with object count and bytes used
    #[instrument(skip(self))]
    pub async fn list_container_details(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<ContainerDetail>> {
        let req = self
            .storage_request(Method::GET, "")?
            .query(&options.query(true));
        let response = self.send(req, "account").await?;
        read_json_listing(response).await
    }

    // ==================== Container Operations ====================

    /// Create a container. Creating an existing container succeeds.
    #[instrument(skip(self))]
    pub async fn create_container(&self, name: &str) -> Result<()> {
        let req = self
            .storage_request(Method::PUT, &container_path(name)?)?
            .header(header::CONTENT_LENGTH, 0);
        self.send(req, name).await?;
        Ok(())
    }

    /// Delete an empty container. A non-empty container yields `Conflict`.
    #[instrument(skip(self))]
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        let req = self.storage_request(Method::DELETE, &container_path(name)?)?;
        self.send(req, name).await?;
        Ok(())
    }

    /// Object count and bytes used for a container
    #[instrument(skip(self))]
    pub async fn head_container(&self, name: &str) -> Result<ContainerInfo> {
        let req = self.storage_request(Method::HEAD, &container_path(name)?)?;
        let response = self.send(req, name).await?;
        Ok(headers::parse(response.headers(), ContainerInfo::HEADERS))
    }

    /// Check if a container exists
    #[instrument(skip(self))]
    pub async fn container_exists(&self, name: &str) -> Result<bool> {
        match self.head_container(name).await {
            Ok(_) => Ok(true),
            Err(CloudFilesError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ==================== Object Operations ====================

    /// List object names in a container
    #[instrument(skip(self))]
    pub async fn list_objects(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<String>> {
        let req = self
            .storage_request(Method::GET, &container_path(container)?)?
            .query(&options.query(false));
        let response = self.send(req, container).await?;
        read_name_listing(response).await
    }

    /// List objects with their details; pseudo-directories appear as
    /// [`ObjectListing::Subdir`]
    #[instrument(skip(self))]
    pub async fn list_objects_details(
        &self,
        container: &str,
        options: &ListOptions,
    ) -> Result<Vec<ObjectListing>> {
        let req = self
            .storage_request(Method::GET, &container_path(container)?)?
            .query(&options.query(true));
        let response = self.send(req, container).await?;
        read_json_listing(response).await
    }

    /// Download an object into memory
    #[instrument(skip(self, options))]
    pub async fn get_object(
        &self,
        container: &str,
        name: &str,
        options: Option<&GetOptions>,
    ) -> Result<Bytes> {
        Ok(self.get_object_with_head(container, name, options).await?.data)
    }

    /// Download an object into memory together with its attributes
    #[instrument(skip(self, options))]
    pub async fn get_object_with_head(
        &self,
        container: &str,
        name: &str,
        options: Option<&GetOptions>,
    ) -> Result<GetObjectResult> {
        let response = self.open_object(container, name, options).await?;
        let head = ObjectHead::from_headers(response.headers());
        let mut data = Vec::with_capacity(initial_capacity(head.content_length));
        self.drain_body(response, head.content_length, &mut data).await?;
        Ok(GetObjectResult {
            data: Bytes::from(data),
            head,
        })
    }

    /// Stream an object into `writer`, returning the number of bytes written.
    ///
    /// Each chunk is written before the next one is read, so a slow writer
    /// slows the download down.
    #[instrument(skip(self, writer, options))]
    pub async fn get_object_to_writer<W>(
        &self,
        container: &str,
        name: &str,
        writer: &mut W,
        options: Option<&GetOptions>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.open_object(container, name, options).await?;
        let total = headers::parse::<ObjectHead>(response.headers(), ObjectHead::HEADERS)
            .content_length;
        self.drain_body(response, total, writer).await
    }

    /// Upload an object.
    ///
    /// Sources without a known length are sent with chunked transfer
    /// encoding. `PreconditionFailed` means the server rejected the declared
    /// length or type; `UnprocessableEntity` means the ETag did not match.
    #[instrument(skip(self, source, options))]
    pub async fn put_object(
        &self,
        container: &str,
        name: &str,
        source: impl Into<ObjectSource>,
        options: PutOptions,
    ) -> Result<PutObjectResult> {
        let path = object_path(container, name)?;
        let source = source.into();

        let mut hdrs = HeaderMap::new();
        options.metadata.write_headers(&mut hdrs)?;

        let content_type = options
            .content_type
            .unwrap_or_else(|| guess_content_type(name));
        hdrs.insert(header::CONTENT_TYPE, header_value(&content_type, "content type")?);

        let etag = match (&options.etag, &source) {
            (Some(etag), _) => Some(etag.clone()),
            (None, ObjectSource::Bytes(data)) => Some(hex::encode(Md5::digest(data))),
            (None, ObjectSource::Stream { .. }) => None,
        };
        if let Some(etag) = &etag {
            hdrs.insert(header::ETAG, header_value(etag, "etag")?);
        }

        let content_length = source.length();
        match content_length {
            Some(len) => {
                hdrs.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            }
            None => debug!("Content length unknown, using chunked transfer encoding"),
        }

        let body = source.into_body(self.read_progress.clone());
        let req = self
            .storage_request(Method::PUT, &path)?
            .headers(hdrs)
            .body(body);
        let response = self.send(req, &format!("{}/{}", container, name)).await?;

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(headers::unquote);

        Ok(PutObjectResult {
            etag,
            content_length,
        })
    }

    /// Replace the user metadata of an object without touching its content
    #[instrument(skip(self, metadata))]
    pub async fn update_object_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        if metadata.is_empty() {
            return Err(CloudFilesError::Validation(
                "metadata update requires at least one entry".to_string(),
            ));
        }
        let path = object_path(container, name)?;
        let mut hdrs = HeaderMap::new();
        metadata.write_headers(&mut hdrs)?;

        let req = self
            .storage_request(Method::POST, &path)?
            .headers(hdrs)
            .header(header::CONTENT_LENGTH, 0);
        self.send(req, &format!("{}/{}", container, name)).await?;
        Ok(())
    }

    /// Object attributes, or `None` when the object does not exist
    #[instrument(skip(self))]
    pub async fn head_object(&self, container: &str, name: &str) -> Result<Option<ObjectHead>> {
        let req = self.storage_request(Method::HEAD, &object_path(container, name)?)?;
        let response = self.execute(req).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, &format!("{}/{}", container, name)).await?;
        Ok(Some(ObjectHead::from_headers(response.headers())))
    }

    /// Check if an object exists
    #[instrument(skip(self))]
    pub async fn object_exists(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self.head_object(container, name).await?.is_some())
    }

    /// Delete an object
    #[instrument(skip(self))]
    pub async fn delete_object(&self, container: &str, name: &str) -> Result<()> {
        let req = self.storage_request(Method::DELETE, &object_path(container, name)?)?;
        self.send(req, &format!("{}/{}", container, name)).await?;
        Ok(())
    }

    /// Server-side copy of an object, metadata included
    #[instrument(skip(self))]
    pub async fn copy_object(
        &self,
        source_container: &str,
        source_name: &str,
        dest_container: &str,
        dest_name: &str,
    ) -> Result<()> {
        let source = object_path(source_container, source_name)?;
        let dest = object_path(dest_container, dest_name)?;

        let req = self
            .storage_request(Method::PUT, &dest)?
            .header(COPY_FROM_HEADER, source)
            .header(header::CONTENT_LENGTH, 0);
        self.send(req, &format!("{}/{}", dest_container, dest_name))
            .await?;
        Ok(())
    }

    // ==================== Helper Methods ====================

    pub(crate) fn session_or_err(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(CloudFilesError::not_authenticated)
    }

    /// Authenticated request against `base` + `path`
    pub(crate) fn endpoint_request(
        &self,
        method: Method,
        base: &str,
        path: &str,
    ) -> Result<RequestBuilder> {
        let session = self.session_or_err()?;
        let url = format!("{}{}", base, path);
        debug!("Sending {} request to {}", method, url);
        Ok(self
            .http
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, session.auth_token.as_str()))
    }

    fn storage_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let base = &self.session_or_err()?.storage_url;
        self.endpoint_request(method, base, path)
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response> {
        Ok(req.send().await?)
    }

    /// Send and turn any non-success status into an error
    pub(crate) async fn send(&self, req: RequestBuilder, resource: &str) -> Result<Response> {
        let response = self.execute(req).await?;
        check_status(response, resource).await
    }

    async fn open_object(
        &self,
        container: &str,
        name: &str,
        options: Option<&GetOptions>,
    ) -> Result<Response> {
        let mut req = self.storage_request(Method::GET, &object_path(container, name)?)?;
        if let Some(opts) = options {
            req = req.headers(opts.headers.clone());
        }
        self.send(req, &format!("{}/{}", container, name)).await
    }

    async fn drain_body<W>(
        &self,
        mut response: Response,
        total: Option<u64>,
        writer: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut transferred = 0u64;
        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            transferred += chunk.len() as u64;
            if let Some(cb) = &self.write_progress {
                cb(TransferProgress {
                    bytes_transferred: transferred,
                    total_bytes: total,
                });
            }
        }
        writer.flush().await?;
        Ok(transferred)
    }
}

fn build_http(
    config: &Config,
    policy: redirect::Policy,
    ca_cert: Option<Certificate>,
) -> Result<Client> {
    let user_agent = header_value(&config.user_agent, "user agent").map_err(|_| {
        CloudFilesError::Config(format!("invalid user agent: {}", config.user_agent))
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, user_agent);

    let mut builder = Client::builder()
        .default_headers(headers)
        .redirect(policy);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if !config.verify_tls {
        warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(cert) = ca_cert {
        builder = builder.add_root_certificate(cert);
    }
    builder.build().map_err(CloudFilesError::Transport)
}

/// Buffer size to reserve for a download, bounded by `MAX_PREALLOCATION`
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
        .min(MAX_PREALLOCATION)
}

pub(crate) async fn check_status(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CloudFilesError::from_status(status, resource, &body))
}

/// Newline-delimited names; 204 means an empty listing
pub(crate) async fn read_name_listing(response: Response) -> Result<Vec<String>> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(Vec::new());
    }
    let text = response.text().await?;
    Ok(text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// JSON array listing; 204 means an empty listing
pub(crate) async fn read_json_listing<T>(response: Response) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(Vec::new());
    }
    let body = response.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_slice(&body)?)
}

pub(crate) fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CloudFilesError::Validation(format!("invalid {}: {}", what, value)))
}

fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("photo.png"), "image/png");
        assert_eq!(guess_content_type("notes.txt"), "text/plain");
        assert_eq!(guess_content_type("dir/no-extension"), "application/octet-stream");
    }

    #[test]
    fn test_missing_ca_bundle_fails_at_startup() {
        let config = Config::default().with_ca_bundle("/nonexistent/ca-bundle.pem");
        match StorageClient::new(config) {
            Err(CloudFilesError::Config(msg)) => assert!(msg.contains("ca-bundle.pem")),
            Err(e) => panic!("Expected Config error, got {:?}", e),
            Ok(_) => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_initial_capacity_is_bounded() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(13)), 13);
        assert_eq!(initial_capacity(Some(1 << 60)), MAX_PREALLOCATION);
        assert_eq!(initial_capacity(Some(u64::MAX)), MAX_PREALLOCATION);
    }

    #[tokio::test]
    async fn test_requires_session() {
        let client = StorageClient::new(Config::default()).unwrap();
        assert!(!client.is_authenticated());
        let err = client.list_containers(&ListOptions::default()).await.unwrap_err();
        assert!(matches!(err, CloudFilesError::Authentication { status: None, .. }));
    }

    #[tokio::test]
    async fn test_validation_precedes_session_check() {
        let client = StorageClient::new(Config::default()).unwrap();
        let err = client.create_container("a/b").await.unwrap_err();
        assert!(err.is_validation());
    }
}
