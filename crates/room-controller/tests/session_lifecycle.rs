//! Session lifecycle integration tests.
//!
//! Drives a `SessionActor` end to end against the `rc-test-utils` fakes:
//! device grants and denials, screen-share round trips, host moderation,
//! signaling events, and termination.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use rc_test_utils::{peer_info, signaling_pair, FakeMediaSource, FakeSignaling};
use room_controller::actors::{Lifecycle, LocalIdentity, RoomSnapshot, SessionActor, SessionHandle};
use room_controller::config::RoomConfig;
use room_controller::errors::SessionError;
use room_controller::media::{MediaController, MediaError};
use room_controller::roster::ParticipantInfo;
use room_controller::signaling::{RoomUpdate, SignalingEvent};

struct TestSession {
    handle: SessionHandle,
    source: Arc<FakeMediaSource>,
    signaling: Arc<FakeSignaling>,
    events: mpsc::Sender<SignalingEvent>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn spawn_with(source: FakeMediaSource, nickname: &str, is_host: bool) -> TestSession {
    init_tracing();
    let config = RoomConfig::default();
    let source = Arc::new(source);
    let media = MediaController::new(
        source.clone(),
        config.camera_constraints(),
        config.screen_constraints(),
    );
    let (signaling, events, events_rx) = signaling_pair();
    let (handle, _task) = SessionActor::spawn(
        "k3j9x2m1qp4za".to_string(),
        LocalIdentity {
            nickname: nickname.to_string(),
            is_host,
        },
        &config,
        media,
        signaling.clone(),
        events_rx,
        CancellationToken::new(),
    );
    TestSession {
        handle,
        source,
        signaling,
        events,
    }
}

/// Poll the snapshot until `pred` holds, panicking after ~1s.
async fn wait_for(handle: &SessionHandle, pred: impl Fn(&RoomSnapshot) -> bool) -> RoomSnapshot {
    for _ in 0..200 {
        let snapshot = handle.snapshot().await.expect("snapshot");
        if pred(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held");
}

fn find<'a>(snapshot: &'a RoomSnapshot, id: &str) -> &'a ParticipantInfo {
    snapshot
        .participants
        .iter()
        .find(|p| p.id == id)
        .expect("participant in roster")
}

fn local<'a>(session: &TestSession, snapshot: &'a RoomSnapshot) -> &'a ParticipantInfo {
    find(snapshot, session.handle.local_participant_id())
}

fn chat_contains(snapshot: &RoomSnapshot, needle: &str) -> bool {
    snapshot.chat.iter().any(|m| m.content.contains(needle))
}

/// Test that a granted join reaches Active with camera on and mic live,
/// announced in chat and on the wire.
#[tokio::test]
async fn test_granted_join_reaches_active() -> Result<(), anyhow::Error> {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    let snapshot = wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    let me = local(&session, &snapshot);
    assert!(me.is_camera_on);
    assert!(!me.is_muted);
    assert!(!me.is_screen_sharing);
    assert!(chat_contains(&snapshot, "Mia joined the room"));
    assert!(session
        .signaling
        .published_any(|u| matches!(u, RoomUpdate::Joined(info) if info.nickname == "Mia")));
    session.handle.cancel();
    Ok(())
}

/// Test that a denied device prompt still yields an Active session,
/// degraded to camera-off and muted, with a UI status line.
#[tokio::test]
async fn test_denied_join_degrades_instead_of_failing() {
    let session = spawn_with(FakeMediaSource::new().deny_camera(), "Mia", false);
    let snapshot = wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    let me = local(&session, &snapshot);
    assert!(!me.is_camera_on);
    assert!(me.is_muted);
    assert_eq!(
        snapshot.device_status.as_deref(),
        Some("Camera or microphone access was denied")
    );
    // The join is still announced
    assert!(chat_contains(&snapshot, "Mia joined the room"));
    session.handle.cancel();
}

/// Test that mute and camera toggles flip the roster flags and publish
/// each change.
#[tokio::test]
async fn test_toggles_update_flags_and_publish() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    assert!(session.handle.toggle_mute().await.unwrap());
    assert!(!session.handle.toggle_camera().await.unwrap());
    assert!(!session.handle.toggle_mute().await.unwrap());

    let snapshot = session.handle.snapshot().await.unwrap();
    let me = local(&session, &snapshot);
    assert!(!me.is_muted);
    assert!(!me.is_camera_on);

    let flag_changes = session
        .signaling
        .published()
        .into_iter()
        .filter(|u| matches!(u, RoomUpdate::FlagsChanged { .. }))
        .count();
    assert_eq!(flag_changes, 3);
    session.handle.cancel();
}

/// Test the screen-share round trip: start sets the flag and swaps the
/// displayed stream, stop restores the camera stream and stops capture.
#[tokio::test]
async fn test_screen_share_round_trip() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session.handle.start_screen_share().await.unwrap();
    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(local(&session, &snapshot).is_screen_sharing);

    // Camera stream first, screen stream second
    let streams = session.source.created_streams();
    assert_eq!(streams.len(), 2);

    session.handle.stop_screen_share().await.unwrap();
    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(!local(&session, &snapshot).is_screen_sharing);

    let streams = session.source.created_streams();
    assert!(streams[1].is_stopped(), "screen capture must be stopped");
    assert!(!streams[0].is_stopped(), "camera must keep running");
    session.handle.cancel();
}

/// Test that a cancelled picker fails the start intent closed, with no
/// state change.
#[tokio::test]
async fn test_cancelled_screen_share_leaves_state_unchanged() {
    let session = spawn_with(FakeMediaSource::new().cancel_screen(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    let result = session.handle.start_screen_share().await;
    assert_eq!(
        result,
        Err(SessionError::Device(MediaError::ShareCancelled))
    );

    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(!local(&session, &snapshot).is_screen_sharing);
    assert_eq!(snapshot.lifecycle, Lifecycle::Active);
    session.handle.cancel();
}

/// Test that ending capture outside the app (the browser-native stop
/// control) is observed and rolls the session back to the camera stream.
#[tokio::test]
async fn test_native_screen_stop_is_observed() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session.handle.start_screen_share().await.unwrap();
    let screen = session.source.created_streams()[1].clone();

    // Capture ends at the device, not through the handle
    screen.stop_all();

    let snapshot = wait_for(&session.handle, |s| {
        !s.participants.iter().any(|p| p.is_screen_sharing)
    })
    .await;
    assert_eq!(snapshot.lifecycle, Lifecycle::Active);
    session.handle.cancel();
}

/// Test that the host can force-mute a participant, with a system chat
/// message and a published update.
#[tokio::test]
async fn test_host_force_mute() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session
        .events
        .send(SignalingEvent::PeerJoined(peer_info("p1", "Ana")))
        .await
        .unwrap();
    wait_for(&session.handle, |s| s.participants.len() == 2).await;

    session.handle.force_mute("p1").await.unwrap();

    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(find(&snapshot, "p1").is_muted);
    assert!(chat_contains(&snapshot, "Ana was muted by the host"));
    assert!(session
        .signaling
        .published_any(|u| matches!(u, RoomUpdate::ForceMute { target_id } if target_id == "p1")));
    session.handle.cancel();
}

/// Test that the host can remove a participant, and that the target id
/// must exist.
#[tokio::test]
async fn test_host_kick() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session
        .events
        .send(SignalingEvent::PeerJoined(peer_info("p1", "Ana")))
        .await
        .unwrap();
    wait_for(&session.handle, |s| s.participants.len() == 2).await;

    session.handle.kick("p1").await.unwrap();

    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.participants.len(), 1);
    assert!(chat_contains(&snapshot, "Ana was removed from the room"));

    let missing = session.handle.kick("ghost").await;
    assert!(matches!(missing, Err(SessionError::ParticipantNotFound(_))));
    session.handle.cancel();
}

/// Test that the host cannot remove themselves.
#[tokio::test]
async fn test_host_cannot_kick_self() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    let self_id = session.handle.local_participant_id().to_string();
    let result = session.handle.kick(self_id).await;
    assert!(matches!(result, Err(SessionError::PermissionDenied(_))));
    session.handle.cancel();
}

/// Test that signaling joins and leaves maintain the roster and narrate
/// the chat, and that a duplicate join is ignored.
#[tokio::test]
async fn test_peer_join_and_leave_events() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", false);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session
        .events
        .send(SignalingEvent::PeerJoined(peer_info("p1", "Ana")))
        .await
        .unwrap();
    session
        .events
        .send(SignalingEvent::PeerJoined(peer_info("p1", "Imposter")))
        .await
        .unwrap();
    let snapshot = wait_for(&session.handle, |s| s.participants.len() == 2).await;
    assert_eq!(find(&snapshot, "p1").nickname, "Ana");
    assert!(chat_contains(&snapshot, "Ana joined the room"));

    session
        .events
        .send(SignalingEvent::PeerLeft {
            participant_id: "p1".to_string(),
        })
        .await
        .unwrap();
    let snapshot = wait_for(&session.handle, |s| s.participants.len() == 1).await;
    assert!(chat_contains(&snapshot, "Ana left the room"));
    session.handle.cancel();
}

/// Test that a host-issued mute arriving over signaling mutes the local
/// user and narrates it.
#[tokio::test]
async fn test_force_muted_event_mutes_local_user() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", false);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session
        .events
        .send(SignalingEvent::ForceMuted {
            by: "host-1".to_string(),
        })
        .await
        .unwrap();

    let snapshot = wait_for(&session.handle, |s| {
        s.participants.iter().any(|p| p.is_muted)
    })
    .await;
    assert!(chat_contains(&snapshot, "You were muted by the host"));
    session.handle.cancel();
}

/// Test that being kicked over signaling terminates the session and stops
/// every device track.
#[tokio::test]
async fn test_kicked_event_terminates_session() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", false);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    session
        .events
        .send(SignalingEvent::Kicked {
            by: "host-1".to_string(),
        })
        .await
        .unwrap();

    let snapshot = wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Terminated).await;
    assert!(snapshot.participants.is_empty());
    assert!(session.source.all_tracks_stopped());
    assert_eq!(
        session.handle.toggle_mute().await,
        Err(SessionError::SessionTerminated)
    );
    session.handle.cancel();
}

/// Test chat: user messages are capped and published, empty messages are
/// dropped, remote messages land in the log.
#[tokio::test]
async fn test_chat_flow() -> Result<(), anyhow::Error> {
    let session = spawn_with(FakeMediaSource::new(), "Mia", false);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    assert!(session.handle.send_chat("x".repeat(600)).await?);
    assert!(!session.handle.send_chat("   ").await?);

    session
        .events
        .send(SignalingEvent::Chat {
            author_name: "Ana".to_string(),
            content: "hello".to_string(),
        })
        .await?;

    let snapshot = wait_for(&session.handle, |s| chat_contains(s, "hello")).await;
    let capped = snapshot
        .chat
        .iter()
        .find(|m| m.author_name.as_deref() == Some("Mia"))
        .expect("local message");
    assert_eq!(capped.content.chars().count(), 500);
    assert!(session
        .signaling
        .published_any(|u| matches!(u, RoomUpdate::Chat { author_name, .. } if author_name == "Mia")));
    session.handle.cancel();
    Ok(())
}

/// Test that leave tears down every stream, clears the roster, publishes
/// the departure, and leaves only snapshot serviceable.
#[tokio::test]
async fn test_leave_tears_down_and_terminates() {
    let session = spawn_with(FakeMediaSource::new(), "Mia", true);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;
    session.handle.start_screen_share().await.unwrap();

    session.handle.leave().await.unwrap();

    assert!(session.source.all_tracks_stopped());
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.lifecycle, Lifecycle::Terminated);
    assert!(snapshot.participants.is_empty());
    assert!(session
        .signaling
        .published_any(|u| matches!(u, RoomUpdate::Left { .. })));

    assert_eq!(
        session.handle.send_chat("late").await,
        Err(SessionError::SessionTerminated)
    );
    assert_eq!(
        session.handle.stop_screen_share().await,
        Err(SessionError::SessionTerminated)
    );
    session.handle.cancel();
}

/// Test that toggles issued while the permission prompt is still open
/// stay in force after acquisition resolves.
#[tokio::test]
async fn test_toggles_during_connecting_survive_acquisition() {
    let (source, gate) = FakeMediaSource::gated();
    let session = spawn_with(source, "Mia", true);

    // Still Connecting; the user mutes and turns the camera off
    assert!(session.handle.toggle_mute().await.unwrap());
    assert!(!session.handle.toggle_camera().await.unwrap());

    gate.add_permits(1);
    let snapshot = wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;
    let me = local(&session, &snapshot);
    assert!(me.is_muted);
    assert!(!me.is_camera_on);

    // The fresh tracks honor the requested state
    let stream = &session.source.created_streams()[0];
    assert!(!stream.audio_track().unwrap().is_enabled());
    assert!(!stream.video_track().unwrap().is_enabled());
    session.handle.cancel();
}

/// Test that leaving while the permission prompt is still open stops the
/// late-arriving stream instead of leaking it.
#[tokio::test]
async fn test_leave_during_pending_acquisition_stops_late_stream() {
    let (source, gate) = FakeMediaSource::gated();
    let session = spawn_with(source, "Mia", true);

    // Still waiting on the prompt; the actor must keep serving intents
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.lifecycle, Lifecycle::Connecting);

    session.handle.leave().await.unwrap();

    // The prompt resolves after the user already left
    gate.add_permits(1);
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Terminated).await;
    for _ in 0..200 {
        if session.source.saw_camera_request() && session.source.all_tracks_stopped() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(session.source.all_tracks_stopped());
    session.handle.cancel();
}

/// Test that a screen-share intent parked on the picker fails with
/// SessionTerminated when the user leaves first.
#[tokio::test]
async fn test_leave_fails_pending_screen_share() {
    let (source, gate) = FakeMediaSource::gated();
    let session = spawn_with(source, "Mia", true);
    gate.add_permits(1); // camera resolves immediately
    wait_for(&session.handle, |s| s.lifecycle == Lifecycle::Active).await;

    let handle = session.handle.clone();
    let pending = tokio::spawn(async move { handle.start_screen_share().await });
    // Wait until the picker request is actually in flight
    for _ in 0..200 {
        if session.source.saw_screen_request() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    session.handle.leave().await.unwrap();
    assert_eq!(
        pending.await.unwrap(),
        Err(SessionError::SessionTerminated)
    );

    gate.add_permits(1);
    for _ in 0..200 {
        if session.source.all_tracks_stopped() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(session.source.all_tracks_stopped());
    session.handle.cancel();
}

/// Test that signaling publish failures degrade to logs, never to intent
/// failures.
#[tokio::test]
async fn test_signaling_failure_does_not_fail_intents() {
    let config = RoomConfig::default();
    let source = Arc::new(FakeMediaSource::new());
    let media = MediaController::new(
        source,
        config.camera_constraints(),
        config.screen_constraints(),
    );
    let (_events_tx, events_rx) = mpsc::channel(8);
    let (handle, _task) = SessionActor::spawn(
        "k3j9x2m1qp4za".to_string(),
        LocalIdentity {
            nickname: "Mia".to_string(),
            is_host: true,
        },
        &config,
        media,
        Arc::new(FakeSignaling::failing()),
        events_rx,
        CancellationToken::new(),
    );

    wait_for(&handle, |s| s.lifecycle == Lifecycle::Active).await;
    assert!(handle.toggle_mute().await.unwrap());
    assert!(handle.send_chat("still works").await.unwrap());
    handle.cancel();
}
