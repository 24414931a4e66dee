//! Error types for the messaging client
//!
//! Defines client-level errors and STOMP frame parsing errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Client-level errors
///
/// Covers connection establishment failures, operations attempted without
/// a live connection, and serialization problems. Malformed inbound
/// payloads are not represented here: they are recovered locally by
/// delivering the raw payload to the subscriber.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Handshake or protocol failure while establishing the connection
    #[error("connection failed: {0}")]
    Connection(String),

    /// An action was attempted with no live connection
    #[error("not connected to broker")]
    NotConnected,

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The client task has shut down (internal channel broken)
    #[error("client task unavailable")]
    ChannelClosed,
}

/// STOMP frame parsing errors
///
/// Raised by the wire codec for frames that cannot be decoded. The
/// connection loop logs and skips such frames rather than failing the
/// connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Frame contained no command line
    #[error("empty frame")]
    Empty,

    /// Command line did not name a known STOMP command
    #[error("unknown STOMP command: {0}")]
    UnknownCommand(String),

    /// Header line was not a `name:value` pair
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
}
