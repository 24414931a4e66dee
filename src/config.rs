//! Client configuration
//!
//! Connection settings for the broker endpoint. Reconnect delay and
//! heartbeat intervals default to the broker's fixed constants and rarely
//! need changing outside tests.

use serde::Deserialize;

/// Default delay before a reconnect attempt after an unexpected close
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

/// Default heartbeat interval the client promises to send
pub const DEFAULT_HEARTBEAT_OUTGOING_MS: u64 = 4000;

/// Default heartbeat interval the client expects from the broker
pub const DEFAULT_HEARTBEAT_INCOMING_MS: u64 = 4000;

/// Configuration for a [`ChatClient`]
///
/// [`ChatClient`]: crate::client::ChatClient
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API server, e.g. `ws://localhost:8080`
    pub base_url: String,
    /// Session cookie sent on the WebSocket handshake (cross-origin auth)
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_heartbeat_outgoing_ms")]
    pub heartbeat_outgoing_ms: u64,
    #[serde(default = "default_heartbeat_incoming_ms")]
    pub heartbeat_incoming_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

fn default_heartbeat_outgoing_ms() -> u64 {
    DEFAULT_HEARTBEAT_OUTGOING_MS
}

fn default_heartbeat_incoming_ms() -> u64 {
    DEFAULT_HEARTBEAT_INCOMING_MS
}

impl ClientConfig {
    /// Create a configuration with default timing constants
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cookie: None,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            heartbeat_outgoing_ms: DEFAULT_HEARTBEAT_OUTGOING_MS,
            heartbeat_incoming_ms: DEFAULT_HEARTBEAT_INCOMING_MS,
        }
    }

    /// Attach a session cookie to the handshake (builder style)
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Full WebSocket endpoint: base URL + `/ws`
    pub fn ws_url(&self) -> String {
        format!("{}/ws", self.base_url.trim_end_matches('/'))
    }

    /// Heartbeat negotiation header value, `outgoing,incoming`
    pub fn heart_beat_header(&self) -> String {
        format!("{},{}", self.heartbeat_outgoing_ms, self.heartbeat_incoming_ms)
    }
}
