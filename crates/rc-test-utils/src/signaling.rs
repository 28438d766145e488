//! Recording signaling channel and event injection helpers.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use room_controller::signaling::{RoomUpdate, SignalingChannel, SignalingError, SignalingEvent};

/// Recording signaling channel.
///
/// Publishes succeed (or fail, when scripted) and are recorded in order for
/// assertion.
pub struct FakeSignaling {
    published: Mutex<Vec<RoomUpdate>>,
    fail: bool,
}

impl FakeSignaling {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A channel whose publishes all fail.
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Everything published so far, in publish order.
    pub fn published(&self) -> Vec<RoomUpdate> {
        self.published.lock().unwrap().clone()
    }

    /// Whether any published update satisfies `predicate`.
    pub fn published_any(&self, predicate: impl Fn(&RoomUpdate) -> bool) -> bool {
        self.published.lock().unwrap().iter().any(predicate)
    }
}

impl Default for FakeSignaling {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingChannel for FakeSignaling {
    async fn publish(&self, update: RoomUpdate) -> Result<(), SignalingError> {
        if self.fail {
            return Err(SignalingError::ChannelUnavailable(
                "fake channel down".to_string(),
            ));
        }
        self.published.lock().unwrap().push(update);
        Ok(())
    }
}

/// Buffer for injected signaling events.
const EVENT_CHANNEL_BUFFER: usize = 64;

/// A recording channel plus an event pipe for driving a session actor:
/// the sender injects inbound [`SignalingEvent`]s, the receiver is handed
/// to the actor at spawn.
pub fn signaling_pair() -> (
    Arc<FakeSignaling>,
    mpsc::Sender<SignalingEvent>,
    mpsc::Receiver<SignalingEvent>,
) {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
    (Arc::new(FakeSignaling::new()), events_tx, events_rx)
}
