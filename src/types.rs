//! Basic type definitions for the messaging client
//!
//! Provides newtype wrappers for type safety:
//! - `RoomId`: numeric chat room identifier
//! - `MessageId`: numeric message identifier
//! - `EventKind`: the three per-room event streams

/// Chat room identifier (newtype pattern)
///
/// Wraps the numeric room id assigned by the API. Implements Hash and Eq
/// for use as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(pub i64);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RoomId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Message identifier (newtype pattern)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The three event streams a room exposes on the broker
///
/// Each kind maps to its own topic destination; a subscription is keyed
/// by `(RoomId, EventKind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// New message posted to the room
    Message,
    /// Message deleted (payload is the message id)
    Delete,
    /// Message edited (payload is the updated message)
    Edit,
}

impl EventKind {
    /// All kinds, in the order subscription keys are reported
    pub const ALL: [EventKind; 3] = [EventKind::Message, EventKind::Delete, EventKind::Edit];
}
