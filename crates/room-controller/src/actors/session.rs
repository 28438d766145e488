//! `SessionActor` - per-room actor that owns session state.
//!
//! The actor:
//! - Owns the participant roster, the chat log, and the media controller
//! - Runs the `Connecting -> Active -> Terminated` lifecycle
//! - Serves UI intents (mute, camera, screen share, chat, host actions)
//! - Consumes inbound signaling events and publishes outbound updates
//!
//! Device acquisition suspends on the user's permission prompt, so it runs
//! in spawned tasks that feed completions back through the mailbox; the
//! actor keeps serving intents while a prompt is open. A leave processed
//! before an acquisition resolves marks the session terminated, and the
//! late completion is stopped instead of attached.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::messages::{Lifecycle, RoomSnapshot, SessionMessage};
use crate::chat::ChatLog;
use crate::config::RoomConfig;
use crate::errors::SessionError;
use crate::media::{MediaController, MediaError, MediaStream};
use crate::roster::{FlagUpdate, Participant, ParticipantRegistry, RegistryError};
use crate::signaling::{RoomUpdate, SignalingChannel, SignalingEvent};

/// Mailbox buffer for the session actor.
const SESSION_CHANNEL_BUFFER: usize = 64;

/// The local user's identity at join time.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    /// Display name, user-supplied, non-empty.
    pub nickname: String,
    /// Host privilege, fixed at room creation.
    pub is_host: bool,
}

/// Handle to a `SessionActor`.
///
/// Cloneable; every method is an intent delivered in mailbox order. Once
/// the session has terminated (or the actor is gone), intents yield
/// [`SessionError::SessionTerminated`].
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    room_id: String,
    local_participant_id: String,
}

impl SessionHandle {
    /// Room this session belongs to.
    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// The local user's participant id.
    #[must_use]
    pub fn local_participant_id(&self) -> &str {
        &self.local_participant_id
    }

    /// Toggle the microphone. Returns the new muted state.
    pub async fn toggle_mute(&self) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ToggleMute { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Toggle the camera. Returns the new camera-on state.
    pub async fn toggle_camera(&self) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ToggleCamera { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Start screen sharing. Resolves once acquisition settles; fails
    /// closed (no state change) if the picker is cancelled or capture
    /// fails.
    pub async fn start_screen_share(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::StartScreenShare { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Stop screen sharing. Always safe; idempotent.
    pub async fn stop_screen_share(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::StopScreenShare { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Send a chat message. Returns `false` if the content trimmed to
    /// empty and was dropped.
    pub async fn send_chat(&self, content: impl Into<String>) -> Result<bool, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::SendChat {
                content: content.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Host-only: mute another participant.
    pub async fn force_mute(&self, target_id: impl Into<String>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::ForceMute {
                target_id: target_id.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Host-only: remove another participant from the room.
    pub async fn kick(&self, target_id: impl Into<String>) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Kick {
                target_id: target_id.into(),
                respond_to: tx,
            })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Current session view for rendering. Remains answerable after
    /// termination (terminated lifecycle, empty roster).
    pub async fn snapshot(&self) -> Result<RoomSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)
    }

    /// Leave the room: teardown of every owned stream, roster cleared,
    /// session terminated.
    pub async fn leave(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Leave { respond_to: tx })
            .await
            .map_err(|_| SessionError::SessionTerminated)?;
        rx.await.map_err(|_| SessionError::SessionTerminated)?
    }

    /// Cancel the session actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Whether the actor has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    room_id: String,
    receiver: mpsc::Receiver<SessionMessage>,
    /// Sender for internal completions (acquisitions, share watchers).
    internal_tx: mpsc::Sender<SessionMessage>,
    signaling_events: mpsc::Receiver<SignalingEvent>,
    signaling_closed: bool,
    cancel_token: CancellationToken,
    lifecycle: Lifecycle,
    local_id: String,
    roster: ParticipantRegistry,
    chat: ChatLog,
    media: MediaController,
    signaling: Arc<dyn SignalingChannel>,
    device_status: Option<String>,
    /// Caller waiting on a pending screen-share acquisition.
    pending_screen: Option<oneshot::Sender<Result<(), SessionError>>>,
    screen_pending: bool,
}

impl SessionActor {
    /// Spawn a session actor for a freshly joined room.
    ///
    /// Inserts the local participant, kicks off camera + microphone
    /// acquisition, and returns a handle plus the task join handle. The
    /// session is `Connecting` until acquisition resolves.
    #[must_use]
    pub fn spawn(
        room_id: String,
        local: LocalIdentity,
        config: &RoomConfig,
        media: MediaController,
        signaling: Arc<dyn SignalingChannel>,
        signaling_events: mpsc::Receiver<SignalingEvent>,
        cancel_token: CancellationToken,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let local_id = Uuid::new_v4().to_string();

        let mut roster = ParticipantRegistry::new(config.max_participants);
        // The flags carry the requested state from the start; toggles issued
        // while the prompt is open land here and acquisition applies them to
        // the tracks once it resolves.
        let mut local_entry = Participant::new(local_id.clone(), local.nickname, local.is_host);
        local_entry.is_camera_on = true;
        roster.upsert_local(local_entry);

        let actor = Self {
            room_id: room_id.clone(),
            receiver,
            internal_tx: sender.clone(),
            signaling_events,
            signaling_closed: false,
            cancel_token: cancel_token.clone(),
            lifecycle: Lifecycle::Connecting,
            local_id: local_id.clone(),
            roster,
            chat: ChatLog::new(config.chat_max_chars),
            media,
            signaling,
            device_status: None,
            pending_screen: None,
            screen_pending: false,
        };

        // Camera + mic acquisition suspends on the permission prompt; run it
        // off the mailbox so intents (including leave) stay serviceable.
        let acquisition = actor.media.acquire_camera();
        let completion_tx = sender.clone();
        tokio::spawn(async move {
            let result = acquisition.await;
            let _ = completion_tx
                .send(SessionMessage::LocalMediaReady { result })
                .await;
        });

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionHandle {
            sender,
            cancel_token,
            room_id,
            local_participant_id: local_id,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "rc.actor.session", fields(room_id = %self.room_id))]
    async fn run(mut self) {
        info!(
            target: "rc.actor.session",
            room_id = %self.room_id,
            "session actor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.terminate("session cancelled").await;
                    break;
                }

                event = self.signaling_events.recv(), if !self.signaling_closed => {
                    match event {
                        Some(event) => self.handle_signaling(event).await,
                        None => {
                            debug!(
                                target: "rc.actor.session",
                                room_id = %self.room_id,
                                "signaling event stream closed"
                            );
                            self.signaling_closed = true;
                        }
                    }
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
            }
        }

        info!(
            target: "rc.actor.session",
            room_id = %self.room_id,
            lifecycle = ?self.lifecycle,
            "session actor stopped"
        );
    }

    /// Handle a single mailbox message.
    async fn handle_message(&mut self, message: SessionMessage) {
        if self.lifecycle == Lifecycle::Terminated {
            self.handle_after_termination(message);
            return;
        }

        match message {
            SessionMessage::ToggleMute { respond_to } => {
                let result = self.handle_toggle_mute().await;
                let _ = respond_to.send(result);
            }
            SessionMessage::ToggleCamera { respond_to } => {
                let result = self.handle_toggle_camera().await;
                let _ = respond_to.send(result);
            }
            SessionMessage::StartScreenShare { respond_to } => {
                self.handle_start_screen_share(respond_to);
            }
            SessionMessage::StopScreenShare { respond_to } => {
                let result = self.handle_stop_screen_share().await;
                let _ = respond_to.send(result);
            }
            SessionMessage::SendChat {
                content,
                respond_to,
            } => {
                let result = self.handle_send_chat(&content).await;
                let _ = respond_to.send(result);
            }
            SessionMessage::ForceMute {
                target_id,
                respond_to,
            } => {
                let result = self.handle_force_mute(&target_id).await;
                let _ = respond_to.send(result);
            }
            SessionMessage::Kick {
                target_id,
                respond_to,
            } => {
                let result = self.handle_kick(&target_id).await;
                let _ = respond_to.send(result);
            }
            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            SessionMessage::Leave { respond_to } => {
                self.terminate("local user left").await;
                let _ = respond_to.send(Ok(()));
            }
            SessionMessage::LocalMediaReady { result } => {
                self.handle_local_media_ready(result).await;
            }
            SessionMessage::ScreenMediaReady { result } => {
                self.handle_screen_media_ready(result).await;
            }
            SessionMessage::ScreenShareEnded { stream_id } => {
                self.handle_screen_share_ended(&stream_id).await;
            }
        }
    }

    /// After termination only reads are served; every mutating intent gets
    /// an explicit `SessionTerminated`, and late acquisitions are stopped.
    fn handle_after_termination(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            SessionMessage::LocalMediaReady { result }
            | SessionMessage::ScreenMediaReady { result } => {
                if let Ok(stream) = result {
                    debug!(
                        target: "rc.actor.session",
                        room_id = %self.room_id,
                        stream_id = %stream.id(),
                        "acquisition resolved after termination, stopping stream"
                    );
                    stream.stop_all();
                }
            }
            SessionMessage::ScreenShareEnded { .. } => {}
            SessionMessage::ToggleMute { respond_to }
            | SessionMessage::ToggleCamera { respond_to } => {
                let _ = respond_to.send(Err(SessionError::SessionTerminated));
            }
            SessionMessage::SendChat { respond_to, .. } => {
                let _ = respond_to.send(Err(SessionError::SessionTerminated));
            }
            SessionMessage::StartScreenShare { respond_to }
            | SessionMessage::StopScreenShare { respond_to }
            | SessionMessage::ForceMute { respond_to, .. }
            | SessionMessage::Kick { respond_to, .. }
            | SessionMessage::Leave { respond_to } => {
                let _ = respond_to.send(Err(SessionError::SessionTerminated));
            }
        }
    }

    async fn handle_toggle_mute(&mut self) -> Result<bool, SessionError> {
        let muted = self
            .roster
            .local()
            .ok_or_else(|| SessionError::Internal("local entry missing".to_string()))?
            .is_muted;
        let muted = !muted;

        // Track-level toggle; a no-op while no local stream exists
        self.media.set_audio_enabled(!muted);
        self.roster
            .update_flags(&self.local_id, FlagUpdate::muted(muted))?;

        self.publish(RoomUpdate::FlagsChanged {
            participant_id: self.local_id.clone(),
            update: FlagUpdate::muted(muted),
        })
        .await;
        Ok(muted)
    }

    async fn handle_toggle_camera(&mut self) -> Result<bool, SessionError> {
        let camera_on = self
            .roster
            .local()
            .ok_or_else(|| SessionError::Internal("local entry missing".to_string()))?
            .is_camera_on;
        let camera_on = !camera_on;

        self.media.set_video_enabled(camera_on);
        self.roster
            .update_flags(&self.local_id, FlagUpdate::camera_on(camera_on))?;

        self.publish(RoomUpdate::FlagsChanged {
            participant_id: self.local_id.clone(),
            update: FlagUpdate::camera_on(camera_on),
        })
        .await;
        Ok(camera_on)
    }

    /// Kick off screen-capture acquisition; the caller's reply is parked
    /// until it settles. Duplicate starts coalesce.
    fn handle_start_screen_share(
        &mut self,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        let already_sharing = self
            .roster
            .local()
            .is_some_and(|local| local.is_screen_sharing);
        if self.screen_pending || already_sharing {
            let _ = respond_to.send(Ok(()));
            return;
        }

        self.screen_pending = true;
        self.pending_screen = Some(respond_to);

        let acquisition = self.media.acquire_screen();
        let completion_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = acquisition.await;
            let _ = completion_tx
                .send(SessionMessage::ScreenMediaReady { result })
                .await;
        });
    }

    async fn handle_screen_media_ready(&mut self, result: Result<MediaStream, MediaError>) {
        self.screen_pending = false;
        let respond_to = self.pending_screen.take();

        match result {
            Ok(stream) => {
                let display = stream.clone();
                if !self.media.attach_screen(stream) {
                    // Torn down between leave and completion
                    if let Some(tx) = respond_to {
                        let _ = tx.send(Err(SessionError::SessionTerminated));
                    }
                    return;
                }
                self.spawn_share_watcher(&display);

                if let Err(err) = self.roster.set_stream(&self.local_id, Some(display)) {
                    warn!(
                        target: "rc.actor.session",
                        room_id = %self.room_id,
                        error = %err,
                        "screen stream attach lost its roster entry"
                    );
                }
                let _ = self
                    .roster
                    .update_flags(&self.local_id, FlagUpdate::screen_sharing(true));

                self.publish(RoomUpdate::FlagsChanged {
                    participant_id: self.local_id.clone(),
                    update: FlagUpdate::screen_sharing(true),
                })
                .await;

                info!(target: "rc.actor.session", room_id = %self.room_id, "screen share started");
                if let Some(tx) = respond_to {
                    let _ = tx.send(Ok(()));
                }
            }
            Err(err) => {
                // Fails closed: no state was changed
                debug!(
                    target: "rc.actor.session",
                    room_id = %self.room_id,
                    error = %err,
                    "screen share acquisition failed"
                );
                if let Some(tx) = respond_to {
                    let _ = tx.send(Err(SessionError::Device(err)));
                }
            }
        }
    }

    /// Stop sharing and restore the camera stream on the local entry.
    async fn handle_stop_screen_share(&mut self) -> Result<(), SessionError> {
        if self.media.screen_stream().is_none() {
            return Ok(());
        }
        self.media.release_screen();

        let camera = self.media.local_stream().cloned();
        let _ = self.roster.set_stream(&self.local_id, camera);
        let _ = self
            .roster
            .update_flags(&self.local_id, FlagUpdate::screen_sharing(false));

        self.publish(RoomUpdate::FlagsChanged {
            participant_id: self.local_id.clone(),
            update: FlagUpdate::screen_sharing(false),
        })
        .await;

        info!(target: "rc.actor.session", room_id = %self.room_id, "screen share stopped");
        Ok(())
    }

    /// End-of-track signal from a share watcher. Stale watchers (a share
    /// that was already replaced or released) are ignored.
    async fn handle_screen_share_ended(&mut self, stream_id: &str) {
        let current = self.media.screen_stream().map(MediaStream::id);
        if current != Some(stream_id) {
            return;
        }
        debug!(
            target: "rc.actor.session",
            room_id = %self.room_id,
            "screen share ended outside the app"
        );
        let _ = self.handle_stop_screen_share().await;
    }

    async fn handle_send_chat(&mut self, content: &str) -> Result<bool, SessionError> {
        let author = self
            .roster
            .local()
            .ok_or_else(|| SessionError::Internal("local entry missing".to_string()))?
            .nickname
            .clone();

        match self.chat.append_user(&author, content) {
            Some(message) => {
                let content = message.content.clone();
                self.publish(RoomUpdate::Chat {
                    author_name: author,
                    content,
                })
                .await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Host mutes a participant. Permission is checked here, not in the UI.
    async fn handle_force_mute(&mut self, target_id: &str) -> Result<(), SessionError> {
        self.require_host("only the host can mute other participants")?;

        let info = self
            .roster
            .update_flags(target_id, FlagUpdate::muted(true))
            .map_err(|_| SessionError::ParticipantNotFound(target_id.to_string()))?;

        self.chat
            .append_system(format!("{} was muted by the host", info.nickname));
        self.publish(RoomUpdate::ForceMute {
            target_id: target_id.to_string(),
        })
        .await;

        info!(target: "rc.actor.session", room_id = %self.room_id, "participant force-muted");
        Ok(())
    }

    /// Host removes a participant. Permission is checked here, not in the UI.
    async fn handle_kick(&mut self, target_id: &str) -> Result<(), SessionError> {
        self.require_host("only the host can remove participants")?;
        if target_id == self.local_id {
            return Err(SessionError::PermissionDenied(
                "the host cannot remove themselves".to_string(),
            ));
        }

        let removed = self
            .roster
            .remove(target_id)
            .ok_or_else(|| SessionError::ParticipantNotFound(target_id.to_string()))?;

        self.chat
            .append_system(format!("{} was removed from the room", removed.nickname));
        self.publish(RoomUpdate::Kick {
            target_id: target_id.to_string(),
        })
        .await;

        info!(
            target: "rc.actor.session",
            room_id = %self.room_id,
            remaining_participants = self.roster.len(),
            "participant removed"
        );
        Ok(())
    }

    /// Camera + microphone acquisition resolved.
    ///
    /// The session goes `Active` either way: success attaches the stream,
    /// failure degrades to camera-off + muted so the room never hangs in
    /// `Connecting`.
    async fn handle_local_media_ready(&mut self, result: Result<MediaStream, MediaError>) {
        match result {
            Ok(stream) => {
                let display = stream.clone();
                if !self.media.attach_local(stream) {
                    return;
                }
                let _ = self.roster.set_stream(&self.local_id, Some(display));
                // Apply the requested flags to the fresh tracks rather than
                // resetting them, so toggles issued while the prompt was open
                // stay in force
                let flags = self.roster.local().map(|l| (l.is_muted, l.is_camera_on));
                if let Some((muted, camera_on)) = flags {
                    self.media.set_audio_enabled(!muted);
                    self.media.set_video_enabled(camera_on);
                }
                info!(target: "rc.actor.session", room_id = %self.room_id, "local media acquired");
            }
            Err(err) => {
                warn!(
                    target: "rc.actor.session",
                    room_id = %self.room_id,
                    error = %err,
                    "local media unavailable, joining degraded"
                );
                self.device_status = Some(SessionError::Device(err).client_message());
                let _ = self.roster.update_flags(
                    &self.local_id,
                    FlagUpdate {
                        muted: Some(true),
                        camera_on: Some(false),
                        screen_sharing: None,
                    },
                );
            }
        }

        if self.lifecycle == Lifecycle::Connecting {
            self.lifecycle = Lifecycle::Active;
        }

        if let Some(local) = self.roster.local() {
            let info = local.to_info();
            self.chat
                .append_system(format!("{} joined the room", info.nickname));
            self.publish(RoomUpdate::Joined(info)).await;
        }
    }

    /// Handle an inbound signaling event.
    async fn handle_signaling(&mut self, event: SignalingEvent) {
        if self.lifecycle == Lifecycle::Terminated {
            return;
        }

        match event {
            SignalingEvent::PeerJoined(info) => {
                if info.id == self.local_id {
                    return;
                }
                let nickname = info.nickname.clone();
                let mut participant = Participant::new(info.id, info.nickname, info.is_host);
                participant.is_muted = info.is_muted;
                participant.is_camera_on = info.is_camera_on;
                participant.is_screen_sharing = info.is_screen_sharing;
                participant.joined_at = info.joined_at;

                match self.roster.insert(participant) {
                    Ok(()) => {
                        self.chat.append_system(format!("{nickname} joined the room"));
                        debug!(
                            target: "rc.actor.session",
                            room_id = %self.room_id,
                            participants = self.roster.len(),
                            "peer joined"
                        );
                    }
                    Err(RegistryError::DuplicateId(id)) => {
                        debug!(
                            target: "rc.actor.session",
                            room_id = %self.room_id,
                            participant_id = %id,
                            "duplicate peer join ignored"
                        );
                    }
                    Err(err) => {
                        warn!(
                            target: "rc.actor.session",
                            room_id = %self.room_id,
                            error = %err,
                            "peer join rejected"
                        );
                    }
                }
            }

            SignalingEvent::PeerLeft { participant_id } => {
                if let Some(removed) = self.roster.remove(&participant_id) {
                    self.chat
                        .append_system(format!("{} left the room", removed.nickname));
                }
            }

            SignalingEvent::PeerFlagsChanged {
                participant_id,
                update,
            } => {
                if self.roster.update_flags(&participant_id, update).is_err() {
                    warn!(
                        target: "rc.actor.session",
                        room_id = %self.room_id,
                        participant_id = %participant_id,
                        "flag update for unknown peer"
                    );
                }
            }

            SignalingEvent::ForceMuted { by: _ } => {
                // Enforced mute of the local user
                self.media.set_audio_enabled(false);
                let _ = self
                    .roster
                    .update_flags(&self.local_id, FlagUpdate::muted(true));
                self.chat.append_system("You were muted by the host");
            }

            SignalingEvent::Kicked { by: _ } => {
                info!(
                    target: "rc.actor.session",
                    room_id = %self.room_id,
                    "removed from the room by the host"
                );
                self.terminate("kicked by host").await;
            }

            SignalingEvent::Chat {
                author_name,
                content,
            } => {
                let _ = self.chat.append_user(&author_name, &content);
            }
        }
    }

    fn require_host(&self, denial: &str) -> Result<(), SessionError> {
        let is_host = self.roster.local().is_some_and(|local| local.is_host);
        if is_host {
            Ok(())
        } else {
            warn!(
                target: "rc.actor.session",
                room_id = %self.room_id,
                "non-host attempted a host-only operation"
            );
            Err(SessionError::PermissionDenied(denial.to_string()))
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            lifecycle: self.lifecycle,
            participants: self.roster.list().map(Participant::to_info).collect(),
            chat: self.chat.snapshot().to_vec(),
            device_status: self.device_status.clone(),
        }
    }

    /// `Active -> Terminated`: teardown exactly once, roster cleared.
    async fn terminate(&mut self, reason: &str) {
        if self.lifecycle == Lifecycle::Terminated {
            return;
        }
        info!(
            target: "rc.actor.session",
            room_id = %self.room_id,
            reason = %reason,
            "terminating session"
        );

        self.publish(RoomUpdate::Left {
            participant_id: self.local_id.clone(),
        })
        .await;

        if let Some(tx) = self.pending_screen.take() {
            let _ = tx.send(Err(SessionError::SessionTerminated));
        }
        self.screen_pending = false;

        self.media.teardown();
        self.roster.clear();
        self.lifecycle = Lifecycle::Terminated;
    }

    /// Watch the share's video track and report its end into the mailbox,
    /// covering the browser-native "stop sharing" control.
    fn spawn_share_watcher(&self, stream: &MediaStream) {
        let Some(track) = stream.video_track() else {
            return;
        };
        let track = track.clone();
        let stream_id = stream.id().to_string();
        let completion_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            track.ended().await;
            let _ = completion_tx
                .send(SessionMessage::ScreenShareEnded { stream_id })
                .await;
        });
    }

    async fn publish(&self, update: RoomUpdate) {
        if let Err(err) = self.signaling.publish(update).await {
            warn!(
                target: "rc.actor.session",
                room_id = %self.room_id,
                error = %err,
                "signaling publish failed"
            );
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::media::{MediaConstraints, MediaSource, MediaStream, MediaTrack, TrackKind};
    use crate::signaling::SignalingError;

    struct StubSource {
        deny_camera: bool,
    }

    #[async_trait]
    impl MediaSource for StubSource {
        async fn request_user_media(
            &self,
            _constraints: &MediaConstraints,
        ) -> Result<MediaStream, MediaError> {
            if self.deny_camera {
                return Err(MediaError::AccessDenied("prompt dismissed".to_string()));
            }
            Ok(MediaStream::new(vec![
                MediaTrack::new(TrackKind::Audio),
                MediaTrack::new(TrackKind::Video),
            ]))
        }

        async fn request_display_media(
            &self,
            _constraints: &MediaConstraints,
        ) -> Result<MediaStream, MediaError> {
            Ok(MediaStream::new(vec![MediaTrack::new(TrackKind::Video)]))
        }
    }

    struct NullSignaling;

    #[async_trait]
    impl SignalingChannel for NullSignaling {
        async fn publish(&self, _update: RoomUpdate) -> Result<(), SignalingError> {
            Ok(())
        }
    }

    fn spawn_session(
        nickname: &str,
        is_host: bool,
        deny_camera: bool,
    ) -> (SessionHandle, mpsc::Sender<SignalingEvent>) {
        let config = RoomConfig::default();
        let media = MediaController::new(
            Arc::new(StubSource { deny_camera }),
            config.camera_constraints(),
            config.screen_constraints(),
        );
        let (events_tx, events_rx) = mpsc::channel(8);
        let (handle, _task) = SessionActor::spawn(
            "room-test".to_string(),
            LocalIdentity {
                nickname: nickname.to_string(),
                is_host,
            },
            &config,
            media,
            Arc::new(NullSignaling),
            events_rx,
            CancellationToken::new(),
        );
        (handle, events_tx)
    }

    async fn wait_active(handle: &SessionHandle) {
        for _ in 0..50 {
            if handle.snapshot().await.unwrap().lifecycle == Lifecycle::Active {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("session never became active");
    }

    #[tokio::test]
    async fn test_spawn_inserts_local_participant() {
        let (handle, _events) = spawn_session("Mia", true, false);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.participants.len(), 1);
        assert_eq!(snapshot.participants[0].nickname, "Mia");
        assert!(snapshot.participants[0].is_host);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_becomes_active_after_acquisition() {
        let (handle, _events) = spawn_session("Mia", true, false);
        wait_active(&handle).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.participants[0].is_camera_on);
        assert!(!snapshot.participants[0].is_muted);
        assert!(snapshot.device_status.is_none());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_denied_media_still_reaches_active_degraded() {
        let (handle, _events) = spawn_session("Mia", true, true);
        wait_active(&handle).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.lifecycle, Lifecycle::Active);
        assert!(!snapshot.participants[0].is_camera_on);
        assert!(snapshot.participants[0].is_muted);
        assert!(snapshot.device_status.is_some());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_toggle_mute_flips_flag() {
        let (handle, _events) = spawn_session("Mia", true, false);
        wait_active(&handle).await;

        assert!(handle.toggle_mute().await.unwrap());
        assert!(!handle.toggle_mute().await.unwrap());
        assert!(handle.toggle_mute().await.unwrap());

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.participants[0].is_muted);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_non_host_host_actions_denied() {
        let (handle, events) = spawn_session("Mia", false, false);
        wait_active(&handle).await;

        events
            .send(SignalingEvent::PeerJoined(
                Participant::new("p1", "Ana", false).to_info(),
            ))
            .await
            .unwrap();

        let result = handle.force_mute("p1").await;
        assert!(matches!(result, Err(SessionError::PermissionDenied(_))));
        let result = handle.kick("p1").await;
        assert!(matches!(result, Err(SessionError::PermissionDenied(_))));

        // The roster is untouched
        let snapshot = handle.snapshot().await.unwrap();
        let peer = snapshot.participants.iter().find(|p| p.id == "p1").unwrap();
        assert!(!peer.is_muted);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_leave_then_intents_yield_terminated() {
        let (handle, _events) = spawn_session("Mia", true, false);
        wait_active(&handle).await;

        handle.leave().await.unwrap();

        assert_eq!(
            handle.toggle_mute().await,
            Err(SessionError::SessionTerminated)
        );
        assert_eq!(
            handle.start_screen_share().await,
            Err(SessionError::SessionTerminated)
        );
        assert_eq!(handle.leave().await, Err(SessionError::SessionTerminated));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.lifecycle, Lifecycle::Terminated);
        assert!(snapshot.participants.is_empty());
        handle.cancel();
    }
}
