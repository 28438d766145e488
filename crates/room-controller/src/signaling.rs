//! Signaling collaborator seam.
//!
//! The real transport (peer discovery, offer exchange, media relay) lives
//! outside this core. The coordinator publishes [`RoomUpdate`]s through the
//! injected [`SignalingChannel`] and consumes inbound [`SignalingEvent`]s
//! from an mpsc receiver the channel implementation feeds. Swapping the
//! implementation never changes the coordinator's contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::{FlagUpdate, ParticipantInfo};

/// Signaling publish failure. Logged by the coordinator, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("signaling channel unavailable: {0}")]
    ChannelUnavailable(String),
}

/// Inbound event delivered by the signaling channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingEvent {
    /// A remote participant entered the room.
    PeerJoined(ParticipantInfo),
    /// A remote participant left the room.
    PeerLeft { participant_id: String },
    /// A remote participant's flags changed.
    PeerFlagsChanged {
        participant_id: String,
        update: FlagUpdate,
    },
    /// The host muted the local user.
    ForceMuted { by: String },
    /// The host removed the local user from the room.
    Kicked { by: String },
    /// A remote participant sent a chat message.
    Chat {
        author_name: String,
        content: String,
    },
}

/// Outbound update published by the session coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomUpdate {
    Joined(ParticipantInfo),
    Left { participant_id: String },
    FlagsChanged {
        participant_id: String,
        update: FlagUpdate,
    },
    ForceMute { target_id: String },
    Kick { target_id: String },
    Chat {
        author_name: String,
        content: String,
    },
}

/// Injected signaling capability.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Publish an update to the other participants.
    async fn publish(&self, update: RoomUpdate) -> Result<(), SignalingError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_shape_is_tagged() {
        let event = SignalingEvent::PeerLeft {
            participant_id: "p1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "peer_left", "participant_id": "p1"})
        );
    }

    #[test]
    fn test_update_deserializes_from_wire() {
        let update: RoomUpdate = serde_json::from_value(json!({
            "type": "force_mute",
            "target_id": "p2",
        }))
        .unwrap();
        assert_eq!(
            update,
            RoomUpdate::ForceMute {
                target_id: "p2".to_string()
            }
        );
    }
}
