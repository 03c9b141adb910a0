//! # Cloud Files Client SDK
//!
//! A client SDK for the Cloud Files object storage REST API and its CDN
//! publishing sidecar.
//!
//! ## Features
//!
//! - **Accounts, containers, objects**: list, create, head, get, put, update and delete
//! - **Metadata**: case-insensitive user metadata carried in `X-Object-Meta-*` headers
//! - **Streaming**: uploads from any async reader (chunked when the length is unknown)
//!   and downloads into any async writer, with per-chunk progress callbacks
//! - **CDN**: publish, unpublish, inspect, list and purge containers
//!
//! ## Example
//!
//! ```rust,ignore
//! use cloudfiles_client::{Config, Credentials, ListOptions, PutOptions, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> cloudfiles_client::Result<()> {
//!     let mut client = StorageClient::new(Config::default())?;
//!     client.authenticate(&Credentials::new("username", "api-key")).await?;
//!
//!     client.create_container("photos").await?;
//!     client
//!         .put_object("photos", "2024/beach.jpg", std::fs::read("beach.jpg")?, PutOptions::new())
//!         .await?;
//!
//!     for name in client.list_objects("photos", &ListOptions::new().with_path("2024")).await? {
//!         println!("{}", name);
//!     }
//!
//!     let uri = client.enable_cdn("photos", None).await?;
//!     println!("Published at {:?}", uri);
//!     Ok(())
//! }
//! ```

mod auth;
mod cdn;
mod client;
mod config;
mod error;
mod headers;
mod metadata;
mod path;
mod transfer;
mod types;

pub use auth::{Credentials, Session};
pub use cdn::{CdnContainer, CdnUpdate, DEFAULT_CDN_TTL, MAX_CDN_TTL, MIN_CDN_TTL};
pub use client::StorageClient;
pub use config::{
    Config, DEFAULT_API_VERSION, DEFAULT_AUTH_HOST, DEFAULT_AUTH_URL, MAX_AUTH_REDIRECTS,
};
pub use error::{CloudFilesError, Result};
pub use metadata::{Metadata, MAX_META_KEY_LEN, MAX_META_VALUE_LEN, META_HEADER_PREFIX};
pub use path::{
    encode_segment, validate_container_name, validate_object_name, MAX_CONTAINER_NAME_LEN,
    MAX_OBJECT_NAME_LEN,
};
pub use transfer::{
    ByteStream, ObjectSource, ProgressCallback, TransferProgress, TRANSFER_CHUNK_SIZE,
};
pub use types::*;
