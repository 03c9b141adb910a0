//! Client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CloudFilesError>;

/// Client errors
#[derive(Error, Debug)]
pub enum CloudFilesError {
    /// No response was obtained (network, DNS or TLS failure)
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Authentication failed, or the call needs a session that is not present
    #[error("authentication error: {message}")]
    Authentication {
        status: Option<u16>,
        message: String,
    },

    /// 404
    #[error("not found: {0}")]
    NotFound(String),

    /// 409, e.g. deleting a non-empty container
    #[error("conflict: {0}")]
    Conflict(String),

    /// 412
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// 422, the uploaded body did not match its ETag
    #[error("unprocessable entity (checksum mismatch): {0}")]
    UnprocessableEntity(String),

    /// Malformed caller input, rejected before any request is sent
    #[error("validation error: {0}")]
    Validation(String),

    /// Any other non-success status
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding error
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudFilesError {
    /// Map a non-success HTTP status to an error.
    ///
    /// `resource` names what the request addressed and is used as the message
    /// for the well-known statuses; `body` is only kept for unexpected ones.
    pub fn from_status(status: StatusCode, resource: &str, body: &str) -> Self {
        let resource = resource.to_string();
        match status {
            StatusCode::UNAUTHORIZED => Self::Authentication {
                status: Some(status.as_u16()),
                message: format!("unauthorized request for {}", resource),
            },
            StatusCode::NOT_FOUND => Self::NotFound(resource),
            StatusCode::CONFLICT => Self::Conflict(resource),
            StatusCode::PRECONDITION_FAILED => Self::PreconditionFailed(resource),
            StatusCode::UNPROCESSABLE_ENTITY => Self::UnprocessableEntity(resource),
            _ => {
                let reason = status.canonical_reason().unwrap_or("Unknown");
                let body = body.trim();
                let message = if body.is_empty() {
                    format!("{} ({})", reason, resource)
                } else {
                    format!("{} ({}): {}", reason, resource, body)
                };
                Self::UnexpectedStatus {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    /// Error raised when an operation is attempted without a session
    pub(crate) fn not_authenticated() -> Self {
        Self::Authentication {
            status: None,
            message: "not authenticated: call authenticate() first".to_string(),
        }
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Authentication { status, .. } => *status,
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::UnprocessableEntity(_) => Some(422),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Validation(_) | Self::Config(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error was raised before any request was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
