//! Media stream and track handles plus the injected capture capability.
//!
//! The browser-level capture APIs (`getUserMedia` / `getDisplayMedia`) are
//! modeled as the [`MediaSource`] trait so the session core can be driven by
//! a real device layer in production and by fakes in tests. Stream and track
//! handles are cheap-clone references to shared state; the device-owning
//! side of every track lives in [`MediaController`](controller::MediaController).

mod controller;

pub use controller::MediaController;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Capture failure reported by a [`MediaSource`].
///
/// Every variant degrades a capability; none of them is fatal to the
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The user denied the camera/microphone permission prompt.
    #[error("device access denied: {0}")]
    AccessDenied(String),

    /// No usable device, or the device failed mid-acquisition.
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// The user dismissed the screen-share picker.
    #[error("screen share cancelled")]
    ShareCancelled,
}

/// Kind of media carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    ended: CancellationToken,
}

/// Handle to a single audio or video track.
///
/// Cloning yields another handle to the same underlying track. `enabled`
/// mirrors the browser track flag: disabling pauses output without
/// releasing the device. [`stop`](Self::stop) is terminal and idempotent;
/// [`ended`](Self::ended) resolves when the track stops, whether through
/// this handle or an external one (e.g. the browser's native "stop
/// sharing" control).
#[derive(Debug, Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    /// Create a live, enabled track.
    #[must_use]
    pub fn new(kind: TrackKind) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: Uuid::new_v4().to_string(),
                kind,
                enabled: AtomicBool::new(true),
                ended: CancellationToken::new(),
            }),
        }
    }

    /// Track identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Track kind.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    /// Whether the track is currently producing media.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Enable or disable output without releasing the device.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the track has not been stopped.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.inner.ended.is_cancelled()
    }

    /// Stop the track and release the underlying device. Idempotent.
    pub fn stop(&self) {
        self.inner.ended.cancel();
    }

    /// Resolve once the track has been stopped, by any handle.
    pub async fn ended(&self) {
        self.inner.ended.cancelled().await;
    }
}

/// Handle to a group of tracks acquired together.
///
/// Cloning yields another handle to the same tracks; the clone held by a
/// roster entry is a read-only display reference, never an owner.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// Create a stream from already-acquired tracks.
    #[must_use]
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Stream identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All tracks in the stream.
    #[must_use]
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// First audio track, if any.
    #[must_use]
    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    /// First video track, if any.
    #[must_use]
    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    /// Stop every track in the stream. Idempotent.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Whether every track has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.tracks.iter().all(|t| !t.is_live())
    }
}

/// Ideal video capture parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
}

/// Audio capture processing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

/// Constraint set passed to a [`MediaSource`] request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

impl MediaConstraints {
    /// Camera + microphone defaults: 1280x720 @ 30fps video, processed audio.
    #[must_use]
    pub fn camera(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            video: Some(VideoConstraints {
                ideal_width: width,
                ideal_height: height,
                ideal_frame_rate: frame_rate,
            }),
            audio: Some(AudioConstraints {
                echo_cancellation: true,
                noise_suppression: true,
                auto_gain_control: true,
            }),
        }
    }

    /// Screen-capture defaults: 1920x1080 @ 30fps video, optional audio.
    #[must_use]
    pub fn screen(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            video: Some(VideoConstraints {
                ideal_width: width,
                ideal_height: height,
                ideal_frame_rate: frame_rate,
            }),
            audio: Some(AudioConstraints {
                echo_cancellation: false,
                noise_suppression: false,
                auto_gain_control: false,
            }),
        }
    }
}

/// Injected device-capture capability.
///
/// Production backs this with the platform capture API; tests use
/// `rc-test-utils`' fake. Both requests suspend until the user answers the
/// permission prompt or picker, so callers spawn them rather than awaiting
/// inside a mailbox loop.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Request a camera + microphone stream.
    async fn request_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError>;

    /// Request a screen-capture stream, independent of the camera stream.
    async fn request_display_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_track_enable_toggle() {
        let track = MediaTrack::new(TrackKind::Audio);
        assert!(track.is_enabled());
        track.set_enabled(false);
        assert!(!track.is_enabled());
        track.set_enabled(false);
        assert!(!track.is_enabled());
        track.set_enabled(true);
        assert!(track.is_enabled());
    }

    #[test]
    fn test_track_stop_is_idempotent() {
        let track = MediaTrack::new(TrackKind::Video);
        assert!(track.is_live());
        track.stop();
        assert!(!track.is_live());
        track.stop();
        assert!(!track.is_live());
    }

    #[test]
    fn test_clone_shares_underlying_track() {
        let track = MediaTrack::new(TrackKind::Video);
        let other = track.clone();
        other.set_enabled(false);
        assert!(!track.is_enabled());
        other.stop();
        assert!(!track.is_live());
    }

    #[tokio::test]
    async fn test_ended_resolves_on_stop() {
        let track = MediaTrack::new(TrackKind::Video);
        let waiter = track.clone();
        let handle = tokio::spawn(async move { waiter.ended().await });
        track.stop();
        handle.await.unwrap();
    }

    #[test]
    fn test_stream_track_lookup() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio),
            MediaTrack::new(TrackKind::Video),
        ]);
        assert_eq!(stream.audio_track().unwrap().kind(), TrackKind::Audio);
        assert_eq!(stream.video_track().unwrap().kind(), TrackKind::Video);
        assert!(!stream.is_stopped());
        stream.stop_all();
        assert!(stream.is_stopped());
    }

    #[test]
    fn test_camera_constraints_enable_audio_processing() {
        let constraints = MediaConstraints::camera(1280, 720, 30);
        let audio = constraints.audio.unwrap();
        assert!(audio.echo_cancellation);
        assert!(audio.noise_suppression);
        assert!(audio.auto_gain_control);
        assert_eq!(constraints.video.unwrap().ideal_width, 1280);
    }
}
