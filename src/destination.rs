//! Broker destination naming
//!
//! The destination scheme is fixed by the broker and must match it exactly:
//! inbound topics are derived from the room id and event kind, outbound
//! application destinations are constants.

use crate::types::{EventKind, RoomId};

/// Destination for new-message publishes
pub const SEND_MESSAGE_DESTINATION: &str = "/app/chat.sendMessage";

/// Destination for delete-message publishes
pub const DELETE_MESSAGE_DESTINATION: &str = "/app/chat.deleteMessage";

/// Destination for edit-message publishes
pub const EDIT_MESSAGE_DESTINATION: &str = "/app/chat.editMessage";

/// Derive the inbound topic for a room and event kind
///
/// `/topic/chat.{roomId}` for new messages, with `.delete` / `.edit`
/// suffixes for the other two streams.
pub fn room_topic(room_id: RoomId, kind: EventKind) -> String {
    match kind {
        EventKind::Message => format!("/topic/chat.{}", room_id),
        EventKind::Delete => format!("/topic/chat.{}.delete", room_id),
        EventKind::Edit => format!("/topic/chat.{}.edit", room_id),
    }
}
