//! Per-chunk HTTP upload.
//!
//! [`ChunkTransport`] performs a single POST and reports the response
//! status; [`ChunkUploader`] turns that status into an attempt result and
//! applies the credential policy for `401` responses.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::credential::CredentialInvalidator;
use crate::error::UploadError;

pub const HEADER_FILE_NAME: &str = "File-Name";
pub const HEADER_QUANTITY_CHUNK: &str = "Quantity-chunk";
pub const HEADER_FILE_CRC32: &str = "File-crc32";
pub const HEADER_DEV: &str = "Dev";

const OCTET_STREAM: &str = "application/octet-stream";

const STATUS_OK: u16 = 200;
const STATUS_UNAUTHORIZED: u16 = 401;

/// Everything needed to send one chunk.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub url: String,
    pub credential: String,
    /// `File-Name` header value.
    pub file_name: String,
    pub sequence: u64,
    /// `Quantity-chunk` header value.
    pub total_chunks: u64,
    /// `File-crc32` header value.
    pub checksum: u32,
    pub dev: bool,
    pub body: Bytes,
}

impl ChunkRequest {
    pub fn is_last(&self) -> bool {
        self.sequence == self.total_chunks
    }
}

/// Sends a chunk and returns the HTTP status code.
///
/// Implemented over `reqwest` by [`HttpTransport`]; tests substitute their
/// own implementation.
pub trait ChunkTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u16, UploadError>> + Send + 'a>>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, UploadError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
        })
    }
}

impl ChunkTransport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u16, UploadError>> + Send + 'a>> {
        Box::pin(async move {
            let mut req = self
                .http
                .post(&request.url)
                .header(CONTENT_TYPE, OCTET_STREAM)
                .header(AUTHORIZATION, request.credential.as_str())
                .header(HEADER_FILE_NAME, request.file_name.as_str())
                .header(HEADER_QUANTITY_CHUNK, request.total_chunks.to_string())
                .header(HEADER_FILE_CRC32, request.checksum.to_string());
            if request.dev {
                req = req.header(HEADER_DEV, "true");
            }

            let resp = req.body(request.body.clone()).send().await?;
            Ok(resp.status().as_u16())
        })
    }
}

/// Result of a single transfer attempt.
#[derive(Debug)]
pub enum AttemptResult {
    /// The server accepted the chunk (200).
    Acked,
    /// The server rejected the credential (401).
    Rejected,
    /// Transport failure or any other status.
    Failed(UploadError),
}

/// Uploads chunks and reacts to authentication rejections.
#[derive(Clone)]
pub struct ChunkUploader {
    transport: Arc<dyn ChunkTransport>,
    invalidator: CredentialInvalidator,
}

impl ChunkUploader {
    pub fn new(transport: Arc<dyn ChunkTransport>, invalidator: CredentialInvalidator) -> Self {
        Self {
            transport,
            invalidator,
        }
    }

    /// Performs one transfer of `request`.
    ///
    /// A 401 clears the stored credential only when it answers the job's
    /// last chunk; on any other chunk it is logged and left alone.
    pub async fn attempt(&self, request: &ChunkRequest) -> AttemptResult {
        match self.transport.send(request).await {
            Ok(STATUS_OK) => {
                debug!(
                    chunk = request.sequence,
                    total = request.total_chunks,
                    bytes = request.body.len(),
                    "chunk accepted"
                );
                AttemptResult::Acked
            }
            Ok(STATUS_UNAUTHORIZED) => {
                if request.is_last() {
                    warn!(
                        chunk = request.sequence,
                        "unauthorized on last chunk, clearing credential"
                    );
                    self.invalidator.invalidate();
                } else {
                    warn!(chunk = request.sequence, "unauthorized");
                }
                AttemptResult::Rejected
            }
            Ok(status) => AttemptResult::Failed(UploadError::Protocol { status }),
            Err(e) => AttemptResult::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockServer, ScriptedTransport};
    use replaybot_settings::{MemorySettingsStore, SettingKey, SettingsStore};

    fn request(url: &str, sequence: u64, total: u64) -> ChunkRequest {
        let body = Bytes::from_static(b"chunk payload");
        ChunkRequest {
            url: url.to_string(),
            credential: "tok".into(),
            file_name: format!("name.part{sequence}.mp4"),
            sequence,
            total_chunks: total,
            checksum: replaybot_transfer::crc32(&body),
            dev: false,
            body,
        }
    }

    fn uploader_with(
        transport: Arc<dyn ChunkTransport>,
    ) -> (ChunkUploader, Arc<MemorySettingsStore>) {
        let store = Arc::new(MemorySettingsStore::with_values([(SettingKey::Token, "tok")]));
        let invalidator = CredentialInvalidator::new(store.clone());
        (ChunkUploader::new(transport, invalidator), store)
    }

    #[tokio::test]
    async fn http_transport_sends_protocol_headers() {
        let server = MockServer::start(vec![(200, String::new())]).await;
        let transport = HttpTransport::new().unwrap();
        let mut req = request(&format!("{}/upload", server.url), 2, 3);
        req.dev = true;

        let status = transport.send(&req).await.unwrap();
        assert_eq!(status, 200);

        let recorded = server.requests();
        assert_eq!(recorded.len(), 1);
        let r = &recorded[0];
        assert_eq!(r.method, "POST");
        assert_eq!(r.path, "/upload");
        assert_eq!(r.header("content-type"), Some("application/octet-stream"));
        assert_eq!(r.header("authorization"), Some("tok"));
        assert_eq!(r.header("file-name"), Some("name.part2.mp4"));
        assert_eq!(r.header("quantity-chunk"), Some("3"));
        assert_eq!(r.header("file-crc32"), Some(req.checksum.to_string().as_str()));
        assert_eq!(r.header("dev"), Some("true"));
        assert_eq!(r.body, b"chunk payload");
        assert_eq!(replaybot_transfer::crc32(&r.body), req.checksum);
    }

    #[tokio::test]
    async fn http_transport_reports_status() {
        let server = MockServer::start(vec![(413, String::new())]).await;
        let transport = HttpTransport::new().unwrap();
        let status = transport.send(&request(&server.url, 1, 1)).await.unwrap();
        assert_eq!(status, 413);
        assert_eq!(server.requests()[0].header("dev"), None);
    }

    #[tokio::test]
    async fn http_transport_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .send(&request(&format!("http://127.0.0.1:{port}"), 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
    }

    #[tokio::test]
    async fn status_classification() {
        let (uploader, _) = uploader_with(Arc::new(ScriptedTransport::status(200)));
        assert!(matches!(uploader.attempt(&request("u", 1, 2)).await, AttemptResult::Acked));

        let (uploader, _) = uploader_with(Arc::new(ScriptedTransport::status(500)));
        assert!(matches!(
            uploader.attempt(&request("u", 1, 2)).await,
            AttemptResult::Failed(UploadError::Protocol { status: 500 })
        ));

        let (uploader, _) = uploader_with(Arc::new(ScriptedTransport::new(|_, _| {
            Err(UploadError::Transport("reset".into()))
        })));
        assert!(matches!(
            uploader.attempt(&request("u", 1, 2)).await,
            AttemptResult::Failed(UploadError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn unauthorized_mid_stream_keeps_credential() {
        let (uploader, store) = uploader_with(Arc::new(ScriptedTransport::status(401)));
        let result = uploader.attempt(&request("u", 2, 3)).await;
        assert!(matches!(result, AttemptResult::Rejected));
        assert_eq!(store.get(SettingKey::Token), "tok");
    }

    #[tokio::test]
    async fn unauthorized_on_last_chunk_clears_credential() {
        let (uploader, store) = uploader_with(Arc::new(ScriptedTransport::status(401)));
        let result = uploader.attempt(&request("u", 3, 3)).await;
        assert!(matches!(result, AttemptResult::Rejected));
        assert_eq!(store.get(SettingKey::Token), "");
    }
}
