//! Participant fixtures.

use room_controller::roster::{Participant, ParticipantInfo};

/// A non-host participant entry.
pub fn participant(id: &str, nickname: &str) -> Participant {
    Participant::new(id, nickname, false)
}

/// A host participant entry.
pub fn host(id: &str, nickname: &str) -> Participant {
    Participant::new(id, nickname, true)
}

/// Serializable info for a non-host peer, as signaling would deliver it.
pub fn peer_info(id: &str, nickname: &str) -> ParticipantInfo {
    participant(id, nickname).to_info()
}
