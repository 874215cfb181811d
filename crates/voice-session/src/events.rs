//! Inbound room events and the UI-facing message log.
//!
//! The transport's callback-style notifications are modeled as one tagged
//! event enum delivered over a single channel, so ordering is whatever the
//! transport observed and the dispatcher can be tested with plain data.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default sender attributed to data messages with no participant identity.
pub const ASSISTANT_SENDER: &str = "AI Assistant";

/// Kind of a published track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Audio media stream.
    Audio,
    /// Video media stream.
    Video,
    /// Arbitrary-payload data stream.
    Data,
}

/// A remote track visible through a subscription.
///
/// The transport owns the track; this is a non-owning description used to
/// key playback sinks and route events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Transport-assigned track identifier.
    pub sid: String,
    /// Track kind.
    pub kind: TrackKind,
    /// Identity of the publishing participant.
    pub participant: String,
}

/// Events delivered by the transport for one room connection.
///
/// FIFO-ordered per the transport's own observation: a participant's
/// connect precedes its track events, and subscribe precedes unsubscribe
/// for the same track.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A remote participant joined the room.
    ParticipantConnected {
        /// Identity of the participant.
        identity: String,
    },

    /// A remote participant left the room.
    ParticipantDisconnected {
        /// Identity of the participant.
        identity: String,
    },

    /// A remote track became subscribed.
    TrackSubscribed {
        /// The subscribed track.
        track: TrackInfo,
    },

    /// A remote track is no longer subscribed.
    TrackUnsubscribed {
        /// The unsubscribed track.
        track: TrackInfo,
    },

    /// A data payload arrived on the room's data channel.
    DataReceived {
        /// Raw payload bytes.
        payload: Bytes,
        /// Publishing participant, if the transport knows it.
        participant: Option<String>,
    },

    /// The transport dropped the connection (remote close, network loss).
    ///
    /// This is the authoritative liveness signal: the state machine must
    /// resynchronize to disconnected when it arrives.
    Disconnected {
        /// Transport-provided reason, if any.
        reason: Option<String>,
    },
}

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    /// Produced locally by the session lifecycle.
    System,
    /// Relayed from a remote participant's data message.
    Remote,
}

/// One entry in the append-only, insertion-ordered message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageLogEntry {
    /// Display name of the sender.
    pub sender: String,
    /// Message text.
    pub content: String,
    /// Entry origin.
    pub origin: MessageOrigin,
}

impl MessageLogEntry {
    /// Build a system-origin entry.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: "system".to_string(),
            content: content.into(),
            origin: MessageOrigin::System,
        }
    }

    /// Build a remote-origin entry.
    #[must_use]
    pub fn remote(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            origin: MessageOrigin::Remote,
        }
    }
}

/// Recognized data-channel message shapes.
///
/// Wire format is UTF-8 JSON; anything that does not match a variant is
/// dropped by [`decode_data_message`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataMessage {
    /// A chat line from the remote assistant.
    Chat {
        /// Message text.
        message: String,
    },
}

/// Decode a data-channel payload, dropping anything unrecognized.
///
/// Malformed bytes and unknown shapes come from remote peers and are never
/// fatal to the session; they are logged at trace level only. Empty chat
/// messages carry no content and are dropped too.
#[must_use]
pub fn decode_data_message(payload: &[u8]) -> Option<DataMessage> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => {
            trace!(target: "vs.events", error = %e, "Dropping non-UTF-8 data payload");
            return None;
        }
    };

    match serde_json::from_str::<DataMessage>(text) {
        Ok(DataMessage::Chat { message }) if message.is_empty() => {
            trace!(target: "vs.events", "Dropping empty chat message");
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            trace!(target: "vs.events", error = %e, "Dropping unrecognized data payload");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_message() {
        let payload = br#"{"type":"chat","message":"hi"}"#;
        assert_eq!(
            decode_data_message(payload),
            Some(DataMessage::Chat {
                message: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_decode_drops_malformed_bytes() {
        assert_eq!(decode_data_message(b"not json"), None);
        assert_eq!(decode_data_message(&[0xff, 0xfe, 0x00]), None);
    }

    #[test]
    fn test_decode_drops_unrecognized_shapes() {
        assert_eq!(decode_data_message(br#"{"type":"other","x":1}"#), None);
        assert_eq!(decode_data_message(br#"{"message":"no type"}"#), None);
        assert_eq!(decode_data_message(br#"[1,2,3]"#), None);
    }

    #[test]
    fn test_decode_drops_empty_chat() {
        assert_eq!(decode_data_message(br#"{"type":"chat","message":""}"#), None);
    }

    #[test]
    fn test_decode_drops_chat_without_message() {
        assert_eq!(decode_data_message(br#"{"type":"chat"}"#), None);
    }

    #[test]
    fn test_message_origin_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageOrigin::System).unwrap(),
            r#""system""#
        );
        assert_eq!(
            serde_json::to_string(&MessageOrigin::Remote).unwrap(),
            r#""remote""#
        );
    }

    #[test]
    fn test_log_entry_constructors() {
        let entry = MessageLogEntry::system("connected");
        assert_eq!(entry.sender, "system");
        assert_eq!(entry.origin, MessageOrigin::System);

        let entry = MessageLogEntry::remote("alice", "hi");
        assert_eq!(entry.sender, "alice");
        assert_eq!(entry.origin, MessageOrigin::Remote);
    }

    #[test]
    fn test_log_entry_serialization_shape() {
        let entry = MessageLogEntry::remote("alice", "hi");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sender": "alice",
                "content": "hi",
                "origin": "remote"
            })
        );
    }
}
