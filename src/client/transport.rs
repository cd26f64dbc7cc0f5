//! Client transport to the search daemon.
//!
//! Each call opens its own connection so an abandoned request can be
//! dropped without poisoning a shared stream. Calls are futures; the
//! sequencer owns cancellation and the per-request deadline.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::debug;

use crate::model::permission::Requester;
use crate::model::types::{DomainId, SearchResponse, SessionBootstrap};
use crate::protocol::{
    ErrorCode, FramedMessage, HealthStatus, MAX_FRAME_LEN, PROTOCOL_VERSION, Request, Response,
    decode_message, default_socket_path, encode_message,
};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Transport failures as the sequencer distinguishes them.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The daemon could not be reached or the connection dropped.
    #[error("daemon unavailable: {0}")]
    Unavailable(String),

    /// The daemon answered with an error response.
    #[error("request rejected ({code:?}): {message}")]
    Rejected { code: ErrorCode, message: String },

    /// Malformed or incompatible frames.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A way to reach the search daemon. Faked in tests.
pub trait SearchTransport: Send + Sync {
    fn search(
        &self,
        term: String,
        domain: DomainId,
        context: String,
        requester: Requester,
    ) -> BoxFuture<Result<SearchResponse, TransportError>>;

    fn bootstrap(&self, requester: Requester) -> BoxFuture<Result<SessionBootstrap, TransportError>>;
}

/// Unix Domain Socket transport.
pub struct UdsTransport {
    socket_path: PathBuf,
    request_counter: AtomicU64,
}

impl UdsTransport {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_socket_path())
    }

    fn next_request_id(&self) -> String {
        format!("qpal-{}", self.request_counter.fetch_add(1, Ordering::Relaxed))
    }

    fn call(&self, request: Request) -> BoxFuture<Result<Response, TransportError>> {
        let socket_path = self.socket_path.clone();
        let request_id = self.next_request_id();
        Box::pin(async move { roundtrip(socket_path, request_id, request).await })
    }

    pub fn health(&self) -> BoxFuture<Result<HealthStatus, TransportError>> {
        let call = self.call(Request::Health);
        Box::pin(async move {
            match call.await? {
                Response::Health(status) => Ok(status),
                other => Err(TransportError::Protocol(format!(
                    "unexpected response: {other:?}"
                ))),
            }
        })
    }

    pub fn shutdown(&self) -> BoxFuture<Result<String, TransportError>> {
        let call = self.call(Request::Shutdown);
        Box::pin(async move {
            match call.await? {
                Response::Shutdown { message } => Ok(message),
                other => Err(TransportError::Protocol(format!(
                    "unexpected response: {other:?}"
                ))),
            }
        })
    }
}

impl SearchTransport for UdsTransport {
    fn search(
        &self,
        term: String,
        domain: DomainId,
        context: String,
        requester: Requester,
    ) -> BoxFuture<Result<SearchResponse, TransportError>> {
        let call = self.call(Request::Search {
            term,
            domain,
            context,
            requester,
        });
        Box::pin(async move {
            match call.await? {
                Response::Search(resp) => Ok(resp),
                other => Err(TransportError::Protocol(format!(
                    "unexpected response: {other:?}"
                ))),
            }
        })
    }

    fn bootstrap(&self, requester: Requester) -> BoxFuture<Result<SessionBootstrap, TransportError>> {
        let call = self.call(Request::Bootstrap { requester });
        Box::pin(async move {
            match call.await? {
                Response::Bootstrap(boot) => Ok(boot),
                other => Err(TransportError::Protocol(format!(
                    "unexpected response: {other:?}"
                ))),
            }
        })
    }
}

/// One framed request/response exchange over a fresh connection.
async fn roundtrip(
    socket_path: PathBuf,
    request_id: String,
    request: Request,
) -> Result<Response, TransportError> {
    let msg = FramedMessage::new(&request_id, request);
    let encoded = encode_message(&msg).map_err(|e| TransportError::Protocol(e.to_string()))?;

    let mut stream = UnixStream::connect(&socket_path).await.map_err(|e| {
        TransportError::Unavailable(format!(
            "connect to {} failed: {e}",
            socket_path.display()
        ))
    })?;

    stream
        .write_all(&encoded)
        .await
        .map_err(|e| TransportError::Unavailable(format!("send failed: {e}")))?;

    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| TransportError::Unavailable(format!("read failed: {e}")))?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Protocol(format!(
            "oversized response frame: {len} bytes"
        )));
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .map_err(|e| TransportError::Unavailable(format!("read failed: {e}")))?;

    let response: FramedMessage<Response> =
        decode_message(&payload).map_err(|e| TransportError::Protocol(e.to_string()))?;

    if response.version != PROTOCOL_VERSION {
        return Err(TransportError::Protocol(format!(
            "protocol version mismatch: expected {PROTOCOL_VERSION}, got {}",
            response.version
        )));
    }

    debug!(request_id = %request_id, "roundtrip complete");

    match response.payload {
        Response::Error(err) => Err(TransportError::Rejected {
            code: err.code,
            message: err.message,
        }),
        other => Ok(other),
    }
}
