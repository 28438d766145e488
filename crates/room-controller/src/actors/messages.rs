//! Mailbox messages and state snapshots for the session actor.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::chat::ChatMessage;
use crate::errors::SessionError;
use crate::media::{MediaError, MediaStream};
use crate::roster::ParticipantInfo;

/// Session lifecycle. `Terminated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Connecting,
    Active,
    Terminated,
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub lifecycle: Lifecycle,
    /// Display-ordered: local user first, then hosts, then join order.
    pub participants: Vec<ParticipantInfo>,
    pub chat: Vec<ChatMessage>,
    /// UI status line for the most recent device failure, if any.
    pub device_status: Option<String>,
}

/// Messages handled by the session actor.
///
/// The `respond_to` oneshots follow the request/reply convention: intents
/// come from the handle, `*Ready`/`*Ended` are internal completions fed back
/// by spawned acquisition and watcher tasks.
#[derive(Debug)]
pub enum SessionMessage {
    ToggleMute {
        respond_to: oneshot::Sender<Result<bool, SessionError>>,
    },
    ToggleCamera {
        respond_to: oneshot::Sender<Result<bool, SessionError>>,
    },
    StartScreenShare {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    StopScreenShare {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    SendChat {
        content: String,
        respond_to: oneshot::Sender<Result<bool, SessionError>>,
    },
    ForceMute {
        target_id: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    Kick {
        target_id: String,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },
    GetSnapshot {
        respond_to: oneshot::Sender<RoomSnapshot>,
    },
    Leave {
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Camera/mic acquisition resolved.
    LocalMediaReady {
        result: Result<MediaStream, MediaError>,
    },
    /// Screen-capture acquisition resolved.
    ScreenMediaReady {
        result: Result<MediaStream, MediaError>,
    },
    /// The screen stream's video track ended (app button or browser-native
    /// stop). Carries the stream id so stale watchers are ignored.
    ScreenShareEnded { stream_id: String },
}
