//! SSE transport adapter
//!
//! Opens the streaming HTTP request and forwards raw `data:` payloads to the
//! session driver, handling partial lines and buffering. Transport-level
//! failures are reported with a generic message, distinct from the in-band
//! `[ERROR]` sentinel; a cancellation-triggered teardown is reported as
//! Aborted, never through the failure path. No automatic retry - a new
//! attempt requires a fresh invocation.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::request::StreamRequest;
use crate::error::StreamError;

/// Generic message for connection-level failures. Server-provided text is
/// never surfaced through this path.
pub const CONNECTION_ERROR: &str = "stream connection error";

/// Events emitted by an open transport connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One SSE data payload, still undecoded
    Fragment(String),
    /// Server closed the stream
    Closed,
    /// Connection-level failure; carries a generic message
    Failed(String),
    /// Torn down by the cancellation token
    Aborted,
}

/// Boundary between the coordinator and the wire.
///
/// `open` resolves once the response headers are in; the fragment stream is
/// then delivered over the returned channel.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, StreamError>;
}

/// Accumulates byte chunks into complete SSE lines and extracts `data:`
/// payloads. Chunk boundaries do not align with line boundaries, so a
/// trailing partial line is carried over to the next chunk.
#[derive(Default)]
pub struct SseFramer {
    partial_line: String,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning the data payloads of every complete
    /// line it finishes.
    pub fn push(&mut self, bytes: &Bytes) -> Vec<String> {
        let text = String::from_utf8_lossy(bytes);
        let combined = format!("{}{}", self.partial_line, text);
        let lines: Vec<&str> = combined.lines().collect();

        // Handle partial lines
        if !combined.ends_with('\n') && !lines.is_empty() {
            self.partial_line = lines.last().unwrap_or(&"").to_string();
        } else {
            self.partial_line.clear();
        }

        let lines_to_process = if self.partial_line.is_empty() {
            lines.len()
        } else {
            lines.len() - 1
        };

        let mut payloads = Vec::new();
        for line in lines.iter().take(lines_to_process) {
            // Skip blank separator lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.to_string());
            }
        }
        payloads
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(
        &self,
        request: StreamRequest,
        cancel: CancellationToken,
    ) -> Result<mpsc::UnboundedReceiver<TransportEvent>, StreamError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .bearer_auth(&request.bearer_token)
            .header("Accept", "text/event-stream");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(url = %request.url, method = %request.method, "opening stream");
        let response = builder.send().await.map_err(|e| {
            warn!("stream request failed to connect: {e}");
            StreamError::Transport(CONNECTION_ERROR.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, url = %request.url, "stream request rejected");
            return Err(StreamError::Transport(CONNECTION_ERROR.to_string()));
        }
        info!(url = %request.url, "stream connected");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut framer = SseFramer::new();
            let mut byte_stream = response.bytes_stream();
            let mut bytes_received = 0usize;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("stream aborted after {bytes_received} bytes");
                        let _ = tx.send(TransportEvent::Aborted);
                        break;
                    }
                    chunk = byte_stream.next() => match chunk {
                        Some(Ok(bytes)) => {
                            bytes_received += bytes.len();
                            for payload in framer.push(&bytes) {
                                if tx.send(TransportEvent::Fragment(payload)).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!("stream interrupted after {bytes_received} bytes: {e}");
                            let _ = tx.send(TransportEvent::Failed(CONNECTION_ERROR.to_string()));
                            break;
                        }
                        None => {
                            debug!("stream closed after {bytes_received} bytes");
                            let _ = tx.send(TransportEvent::Closed);
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_str(framer: &mut SseFramer, s: &str) -> Vec<String> {
        framer.push(&Bytes::copy_from_slice(s.as_bytes()))
    }

    #[test]
    fn test_framer_extracts_data_payloads() {
        let mut framer = SseFramer::new();
        let payloads = push_str(&mut framer, "data: Hello\n\ndata: world\n\n");
        assert_eq!(payloads, vec!["Hello", "world"]);
    }

    #[test]
    fn test_framer_carries_partial_lines_across_chunks() {
        let mut framer = SseFramer::new();
        assert!(push_str(&mut framer, "data: Hel").is_empty());
        let payloads = push_str(&mut framer, "lo\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["Hello", "[DONE]"]);
    }

    #[test]
    fn test_framer_skips_comments_and_blank_lines() {
        let mut framer = SseFramer::new();
        let payloads = push_str(&mut framer, ": keepalive\n\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_framer_keeps_empty_data_payload() {
        // An empty payload is a heartbeat; the decoder classifies it, the
        // framer must not swallow it.
        let mut framer = SseFramer::new();
        let payloads = push_str(&mut framer, "data: \n\n");
        assert_eq!(payloads, vec![""]);
    }

    #[test]
    fn test_framer_split_mid_prefix() {
        let mut framer = SseFramer::new();
        assert!(push_str(&mut framer, "da").is_empty());
        let payloads = push_str(&mut framer, "ta: chunk\n");
        assert_eq!(payloads, vec!["chunk"]);
    }
}
