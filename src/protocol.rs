//! Wire protocol between the palette client and the search daemon.
//!
//! Messages are MessagePack payloads framed with a 4-byte big-endian length
//! prefix, carried over a Unix Domain Socket. Every frame embeds the
//! protocol version and a request id used for correlation and logging.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::permission::Requester;
use crate::model::types::{DomainId, SearchResponse, SessionBootstrap};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are rejected outright.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Default socket path, namespaced per user.
pub fn default_socket_path() -> std::path::PathBuf {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".into());
    // Keep only alphanumeric, dash, underscore to prevent path traversal.
    let safe_user: String = user
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    let safe_user = if safe_user.is_empty() {
        "unknown".to_string()
    } else {
        safe_user
    };
    std::path::PathBuf::from(format!("/tmp/qpal-{safe_user}.sock"))
}

/// Request types handled by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Execute a single-domain search.
    Search {
        term: String,
        domain: DomainId,
        /// Opaque caller tag echoed back in the response meta.
        context: String,
        requester: Requester,
    },

    /// Fetch the admin-menu snapshot and idle panels for a new session.
    Bootstrap { requester: Requester },

    /// Health check - returns daemon status.
    Health,

    /// Request graceful shutdown.
    Shutdown,
}

/// Response types from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Search(SearchResponse),
    Bootstrap(SessionBootstrap),
    Health(HealthStatus),
    Shutdown { message: String },
    Error(ErrorResponse),
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub uptime_secs: u64,
    pub version: u32,
    pub ready: bool,
    pub total_requests: u64,
}

/// Error response from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    Internal,
    InvalidInput,
    Forbidden,
    VersionMismatch,
}

/// Framed message wrapper for the length-prefixed protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramedMessage<T> {
    pub version: u32,
    /// Request id for correlation.
    pub request_id: String,
    pub payload: T,
}

impl<T> FramedMessage<T> {
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            request_id: request_id.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("encode error: {0}")]
pub struct EncodeError(pub String);

#[derive(Debug, Clone, Error)]
#[error("decode error: {0}")]
pub struct DecodeError(pub String);

/// Encode a message to MessagePack bytes with length prefix.
pub fn encode_message<T: Serialize>(msg: &FramedMessage<T>) -> Result<Vec<u8>, EncodeError> {
    let payload = rmp_serde::to_vec(msg).map_err(|e| EncodeError(e.to_string()))?;
    let len = payload.len() as u32;
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a message from MessagePack bytes (without length prefix).
pub fn decode_message<T: for<'de> Deserialize<'de>>(
    data: &[u8],
) -> Result<FramedMessage<T>, DecodeError> {
    rmp_serde::from_slice(data).map_err(|e| DecodeError(e.to_string()))
}
