//! Upload sources and transfer progress reporting

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the chunks read from upload sources
pub const TRANSFER_CHUNK_SIZE: usize = 64 * 1024;

/// Progress callback type.
///
/// Called inline for every chunk sent or received, so it must return quickly
/// and must not panic.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Stream of body chunks
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Transfer progress information
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes sent or received so far
    pub bytes_transferred: u64,
    /// Total bytes, when known up front
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Get percentage complete, if the total is known
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some((self.bytes_transferred as f64 / total as f64) * 100.0),
            None => None,
        }
    }
}

/// Body of an object upload
pub enum ObjectSource {
    /// In-memory data; length is always known
    Bytes(Bytes),
    /// Streamed data. With `length: None` the upload uses chunked transfer
    /// encoding, otherwise the length is declared up front.
    Stream {
        stream: ByteStream,
        length: Option<u64>,
    },
}

impl ObjectSource {
    /// Stream from any async reader
    pub fn from_reader<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Stream {
            stream: reader_stream(reader),
            length,
        }
    }

    /// Stream from a local file, declaring its size
    pub async fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let length = file.metadata().await?.len();
        Ok(Self::from_reader(file, Some(length)))
    }

    /// Declared body length; `None` means chunked
    pub fn length(&self) -> Option<u64> {
        match self {
            Self::Bytes(data) => Some(data.len() as u64),
            Self::Stream { length, .. } => *length,
        }
    }

    /// Convert into a request body, reporting progress per chunk when asked
    pub(crate) fn into_body(self, progress: Option<ProgressCallback>) -> reqwest::Body {
        let total = self.length();
        match (self, progress) {
            (Self::Bytes(data), None) => reqwest::Body::from(data),
            (Self::Bytes(data), Some(cb)) => {
                reqwest::Body::wrap_stream(with_progress(chunk_bytes(data), total, cb))
            }
            (Self::Stream { stream, .. }, None) => reqwest::Body::wrap_stream(stream),
            (Self::Stream { stream, .. }, Some(cb)) => {
                reqwest::Body::wrap_stream(with_progress(stream, total, cb))
            }
        }
    }
}

impl fmt::Debug for ObjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Self::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

impl From<Bytes> for ObjectSource {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

impl From<Vec<u8>> for ObjectSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

impl From<&'static [u8]> for ObjectSource {
    fn from(data: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(data))
    }
}

impl From<&'static str> for ObjectSource {
    fn from(data: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(data.as_bytes()))
    }
}

impl From<String> for ObjectSource {
    fn from(data: String) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

fn reader_stream<R>(reader: R) -> ByteStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, io::Error>(Some((Bytes::from(buf), reader)))
    })
    .boxed()
}

fn chunk_bytes(data: Bytes) -> ByteStream {
    let chunks: Vec<io::Result<Bytes>> = (0..data.len())
        .step_by(TRANSFER_CHUNK_SIZE)
        .map(|start| Ok(data.slice(start..(start + TRANSFER_CHUNK_SIZE).min(data.len()))))
        .collect();
    stream::iter(chunks).boxed()
}

fn with_progress(
    stream: ByteStream,
    total: Option<u64>,
    progress: ProgressCallback,
) -> ByteStream {
    let mut transferred = 0u64;
    stream
        .map_ok(move |chunk| {
            transferred += chunk.len() as u64;
            progress(TransferProgress {
                bytes_transferred: transferred,
                total_bytes: total,
            });
            chunk
        })
        .boxed()
}
