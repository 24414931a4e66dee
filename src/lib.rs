//! Real-time chat messaging client
//!
//! A STOMP-over-WebSocket client for the chat broker, multiplexing
//! per-room topic subscriptions over a single persistent connection.
//!
//! # Features
//! - Idempotent `connect`: concurrent callers share one attempt, one transport
//! - Per-room subscriptions to message / delete / edit streams
//! - Fire-and-forget publish of new, deleted, and edited messages
//! - Automatic reconnection with fixed delay, re-arming subscriptions
//! - Heartbeats and a silent-connection watchdog
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - A connection actor owns the transport handle, the connection state
//!   machine, and the subscription registry
//! - [`ChatClient`] is a cheap clone-able handle forwarding commands
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use chat_realtime_client::{ChatClient, ClientConfig, RoomCallbacks, RoomId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::new(ClientConfig::new("ws://localhost:8080"));
//!     client.connect().await?;
//!
//!     client
//!         .subscribe_to_room(
//!             RoomId(42),
//!             RoomCallbacks::new().on_message(|payload| println!("{:?}", payload)),
//!         )
//!         .await?;
//!
//!     client.send_message(RoomId(42), "hello").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod destination;
pub mod error;
pub mod frame;
pub mod message;
pub mod types;

mod connection;
mod transport;

// Re-export main types for convenience
pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::{ClientError, FrameError};
pub use message::{ChatMessage, EventCallback, InboundPayload, OutboundAction, RoomCallbacks};
pub use types::{EventKind, MessageId, RoomId};
