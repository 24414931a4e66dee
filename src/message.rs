//! Payload definitions for the message bus
//!
//! JSON payloads exchanged with the broker (camelCase field names on the
//! wire), the outbound action model, and the callback types invoked for
//! inbound room events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::destination::{
    DELETE_MESSAGE_DESTINATION, EDIT_MESSAGE_DESTINATION, SEND_MESSAGE_DESTINATION,
};
use crate::types::{EventKind, MessageId, RoomId};

/// A chat message as delivered on a room's message and edit topics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub time_sent: String,
}

/// Payload published to `/app/chat.sendMessage`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SendMessagePayload {
    chat_room_id: i64,
    content: String,
}

/// Payload published to `/app/chat.deleteMessage`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DeleteMessagePayload {
    message_id: i64,
}

/// Payload published to `/app/chat.editMessage`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EditMessagePayload {
    message_id: i64,
    new_content: String,
}

/// An outbound publish action
///
/// Ephemeral: constructed, serialized to its destination, and discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    NewMessage { room_id: RoomId, content: String },
    DeleteMessage { message_id: MessageId },
    EditMessage { message_id: MessageId, new_content: String },
}

impl OutboundAction {
    /// Fixed broker destination for this action
    pub fn destination(&self) -> &'static str {
        match self {
            OutboundAction::NewMessage { .. } => SEND_MESSAGE_DESTINATION,
            OutboundAction::DeleteMessage { .. } => DELETE_MESSAGE_DESTINATION,
            OutboundAction::EditMessage { .. } => EDIT_MESSAGE_DESTINATION,
        }
    }

    /// Serialize the wire payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            OutboundAction::NewMessage { room_id, content } => {
                serde_json::to_string(&SendMessagePayload {
                    chat_room_id: room_id.0,
                    content: content.clone(),
                })
            }
            OutboundAction::DeleteMessage { message_id } => {
                serde_json::to_string(&DeleteMessagePayload {
                    message_id: message_id.0,
                })
            }
            OutboundAction::EditMessage {
                message_id,
                new_content,
            } => serde_json::to_string(&EditMessagePayload {
                message_id: message_id.0,
                new_content: new_content.clone(),
            }),
        }
    }
}

/// Payload delivered to a subscription callback
///
/// Inbound bodies are expected to be JSON; when decoding fails the raw
/// text is delivered instead so no event is silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundPayload {
    /// Body decoded as JSON
    Json(serde_json::Value),
    /// Body that did not decode; delivered verbatim
    Raw(String),
}

impl InboundPayload {
    /// Decode a frame body, falling back to the raw text
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => InboundPayload::Json(value),
            Err(_) => InboundPayload::Raw(body.to_string()),
        }
    }

    /// The decoded JSON value, if this payload decoded
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            InboundPayload::Json(value) => Some(value),
            InboundPayload::Raw(_) => None,
        }
    }
}

/// Callback invoked for each inbound event on one channel
pub type EventCallback = Arc<dyn Fn(InboundPayload) + Send + Sync>;

/// Per-room callback set for [`subscribe_to_room`]
///
/// Only the streams with a callback present are subscribed; a consumer
/// that cares about new messages alone registers one callback.
///
/// [`subscribe_to_room`]: crate::client::ChatClient::subscribe_to_room
#[derive(Clone, Default)]
pub struct RoomCallbacks {
    pub on_message: Option<EventCallback>,
    pub on_delete: Option<EventCallback>,
    pub on_edit: Option<EventCallback>,
}

impl RoomCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the new-message callback (builder style)
    pub fn on_message(mut self, f: impl Fn(InboundPayload) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Set the message-deleted callback (builder style)
    pub fn on_delete(mut self, f: impl Fn(InboundPayload) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Arc::new(f));
        self
    }

    /// Set the message-edited callback (builder style)
    pub fn on_edit(mut self, f: impl Fn(InboundPayload) + Send + Sync + 'static) -> Self {
        self.on_edit = Some(Arc::new(f));
        self
    }

    /// Callback for one event kind, if registered
    pub fn get(&self, kind: EventKind) -> Option<&EventCallback> {
        match kind {
            EventKind::Message => self.on_message.as_ref(),
            EventKind::Delete => self.on_delete.as_ref(),
            EventKind::Edit => self.on_edit.as_ref(),
        }
    }
}

impl std::fmt::Debug for RoomCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomCallbacks")
            .field("on_message", &self.on_message.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_edit", &self.on_edit.is_some())
            .finish()
    }
}
