//! Test doubles shared by the uploader's unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::{ChunkRequest, ChunkTransport};
use crate::credential::Notifier;
use crate::error::UploadError;

// ---------------------------------------------------------------------------
// Mock HTTP server
// ---------------------------------------------------------------------------

/// A request captured by [`MockServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Minimal HTTP/1.1 server answering each connection with the next scripted
/// `(status, body)`; the last response repeats once the script runs out.
pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            let mut served = 0usize;
            while let Ok((mut stream, _)) = listener.accept().await {
                let (status, body) = responses
                    .get(served)
                    .or(responses.last())
                    .cloned()
                    .unwrap_or((200, String::new()));
                served += 1;

                if let Some(req) = read_request(&mut stream).await {
                    recorded.lock().unwrap().push(req);
                }

                let resp = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            url,
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

type Script = dyn Fn(&ChunkRequest, u32) -> Result<u16, UploadError> + Send + Sync;

/// [`ChunkTransport`] whose answer is computed from the request and the
/// 1-based attempt number for that chunk sequence.
///
/// Tracks the number of concurrently running sends and the peak observed.
pub struct ScriptedTransport {
    script: Box<Script>,
    delay: Duration,
    attempts: Mutex<HashMap<u64, u32>>,
    sent: Mutex<Vec<ChunkRequest>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(
        script: impl Fn(&ChunkRequest, u32) -> Result<u16, UploadError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            attempts: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Always answers `status`.
    pub fn status(status: u16) -> Self {
        Self::new(move |_, _| Ok(status))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts_for(&self, sequence: u64) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&sequence)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().unwrap().values().sum()
    }

    pub fn sent(&self) -> Vec<ChunkRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ChunkTransport for ScriptedTransport {
    fn send<'a>(
        &'a self,
        request: &'a ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u16, UploadError>> + Send + 'a>> {
        Box::pin(async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let n = attempts.entry(request.sequence).or_insert(0);
                *n += 1;
                *n
            };
            self.sent.lock().unwrap().push(request.clone());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = (self.script)(request, attempt);
            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Records every link-required notification.
#[derive(Default)]
pub struct RecordingNotifier {
    pub links: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn link_required(&self, link: &str) {
        self.links.lock().unwrap().push(link.to_string());
    }
}
