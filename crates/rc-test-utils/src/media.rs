//! Scriptable capture capability for session tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use room_controller::media::{
    MediaConstraints, MediaError, MediaSource, MediaStream, MediaTrack, TrackKind,
};

/// Fake capture source.
///
/// Grants everything by default; builder methods script denial,
/// unavailability, and picker cancellation. Every stream it creates is
/// recorded so tests can assert teardown stopped all device tracks.
///
/// `gated()` builds a source whose acquisitions park until the test
/// releases a permit, for exercising intents while a permission prompt is
/// open.
pub struct FakeMediaSource {
    deny_camera: bool,
    camera_unavailable: bool,
    deny_screen: bool,
    cancel_screen: bool,
    gate: Option<Arc<Semaphore>>,
    created: Mutex<Vec<MediaStream>>,
    camera_requests: AtomicBool,
    screen_requests: AtomicBool,
}

impl FakeMediaSource {
    /// A source that grants every request immediately.
    pub fn new() -> Self {
        Self {
            deny_camera: false,
            camera_unavailable: false,
            deny_screen: false,
            cancel_screen: false,
            gate: None,
            created: Mutex::new(Vec::new()),
            camera_requests: AtomicBool::new(false),
            screen_requests: AtomicBool::new(false),
        }
    }

    /// Camera/mic requests fail with `AccessDenied`.
    pub fn deny_camera(mut self) -> Self {
        self.deny_camera = true;
        self
    }

    /// Camera/mic requests fail with `Unavailable`.
    pub fn camera_unavailable(mut self) -> Self {
        self.camera_unavailable = true;
        self
    }

    /// Screen requests fail with `AccessDenied`.
    pub fn deny_screen(mut self) -> Self {
        self.deny_screen = true;
        self
    }

    /// Screen requests fail with `ShareCancelled` (user dismissed the picker).
    pub fn cancel_screen(mut self) -> Self {
        self.cancel_screen = true;
        self
    }

    /// A source whose acquisitions park until the returned gate hands out a
    /// permit (one permit per acquisition).
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut source = Self::new();
        source.gate = Some(gate.clone());
        (source, gate)
    }

    /// Every stream this source ever created, in creation order.
    pub fn created_streams(&self) -> Vec<MediaStream> {
        self.created.lock().unwrap().clone()
    }

    /// Whether every track of every created stream has been stopped.
    pub fn all_tracks_stopped(&self) -> bool {
        self.created
            .lock()
            .unwrap()
            .iter()
            .all(MediaStream::is_stopped)
    }

    /// Whether a camera/mic request was ever made.
    pub fn saw_camera_request(&self) -> bool {
        self.camera_requests.load(Ordering::SeqCst)
    }

    /// Whether a screen request was ever made.
    pub fn saw_screen_request(&self) -> bool {
        self.screen_requests.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate semaphore closed").forget();
        }
    }

    fn record(&self, stream: MediaStream) -> MediaStream {
        self.created.lock().unwrap().push(stream.clone());
        stream
    }
}

impl Default for FakeMediaSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSource for FakeMediaSource {
    async fn request_user_media(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.camera_requests.store(true, Ordering::SeqCst);
        self.wait_gate().await;
        if self.deny_camera {
            return Err(MediaError::AccessDenied(
                "permission prompt dismissed".to_string(),
            ));
        }
        if self.camera_unavailable {
            return Err(MediaError::Unavailable("no capture device".to_string()));
        }
        Ok(self.record(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio),
            MediaTrack::new(TrackKind::Video),
        ])))
    }

    async fn request_display_media(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.screen_requests.store(true, Ordering::SeqCst);
        self.wait_gate().await;
        if self.cancel_screen {
            return Err(MediaError::ShareCancelled);
        }
        if self.deny_screen {
            return Err(MediaError::AccessDenied(
                "screen capture refused".to_string(),
            ));
        }
        Ok(self.record(MediaStream::new(vec![MediaTrack::new(TrackKind::Video)])))
    }
}
