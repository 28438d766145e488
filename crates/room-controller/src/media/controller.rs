//! `MediaController` - exclusive owner of the local camera/mic and screen
//! streams.
//!
//! No other component starts or stops a device-level track. The roster only
//! holds cloned display handles; the session actor asks this controller for
//! every device-level side effect.
//!
//! Acquisition suspends on the user's permission prompt, so the controller
//! hands out `'static` futures the caller can spawn and later feed back via
//! [`attach_local`](MediaController::attach_local) /
//! [`attach_screen`](MediaController::attach_screen). Both attach paths
//! refuse (and stop) streams that resolve after teardown, so a leave issued
//! while acquisition is pending never leaks a device handle.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{MediaConstraints, MediaError, MediaSource, MediaStream};

/// Owner of local device streams.
pub struct MediaController {
    source: Arc<dyn MediaSource>,
    camera_constraints: MediaConstraints,
    screen_constraints: MediaConstraints,
    local: Option<MediaStream>,
    screen: Option<MediaStream>,
    torn_down: bool,
}

impl MediaController {
    /// Create a controller over an injected capture capability.
    #[must_use]
    pub fn new(
        source: Arc<dyn MediaSource>,
        camera_constraints: MediaConstraints,
        screen_constraints: MediaConstraints,
    ) -> Self {
        Self {
            source,
            camera_constraints,
            screen_constraints,
            local: None,
            screen: None,
            torn_down: false,
        }
    }

    /// Begin camera + microphone acquisition.
    ///
    /// The returned future is independent of `self` so the caller can spawn
    /// it and keep processing intents while the permission prompt is open.
    pub fn acquire_camera(
        &self,
    ) -> impl Future<Output = Result<MediaStream, MediaError>> + Send + 'static {
        let source = Arc::clone(&self.source);
        let constraints = self.camera_constraints;
        async move { source.request_user_media(&constraints).await }
    }

    /// Begin screen-capture acquisition, independent of the camera stream.
    pub fn acquire_screen(
        &self,
    ) -> impl Future<Output = Result<MediaStream, MediaError>> + Send + 'static {
        let source = Arc::clone(&self.source);
        let constraints = self.screen_constraints;
        async move { source.request_display_media(&constraints).await }
    }

    /// Adopt an acquired camera/mic stream.
    ///
    /// Returns `false` and stops the stream if the controller was already
    /// torn down (acquisition resolved after leave). A previously attached
    /// stream is stopped before displacement.
    pub fn attach_local(&mut self, stream: MediaStream) -> bool {
        if self.torn_down {
            warn!(
                target: "rc.media",
                stream_id = %stream.id(),
                "local stream resolved after teardown, stopping"
            );
            stream.stop_all();
            return false;
        }
        if let Some(previous) = self.local.take() {
            previous.stop_all();
        }
        debug!(target: "rc.media", stream_id = %stream.id(), "local stream attached");
        self.local = Some(stream);
        true
    }

    /// Adopt an acquired screen-capture stream. Same late-arrival rules as
    /// [`attach_local`](Self::attach_local).
    pub fn attach_screen(&mut self, stream: MediaStream) -> bool {
        if self.torn_down {
            warn!(
                target: "rc.media",
                stream_id = %stream.id(),
                "screen stream resolved after teardown, stopping"
            );
            stream.stop_all();
            return false;
        }
        if let Some(previous) = self.screen.take() {
            previous.stop_all();
        }
        debug!(target: "rc.media", stream_id = %stream.id(), "screen stream attached");
        self.screen = Some(stream);
        true
    }

    /// Toggle the local audio track without reacquiring the device.
    ///
    /// Returns `true` if a track was actually toggled; no-op without a
    /// local stream.
    pub fn set_audio_enabled(&self, enabled: bool) -> bool {
        match self.local.as_ref().and_then(MediaStream::audio_track) {
            Some(track) => {
                track.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Toggle the local video track without reacquiring the device.
    pub fn set_video_enabled(&self, enabled: bool) -> bool {
        match self.local.as_ref().and_then(MediaStream::video_track) {
            Some(track) => {
                track.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Display handle for the local camera/mic stream.
    #[must_use]
    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local.as_ref()
    }

    /// Display handle for the screen-capture stream.
    #[must_use]
    pub fn screen_stream(&self) -> Option<&MediaStream> {
        self.screen.as_ref()
    }

    /// Stop every screen-capture track and free the handle. Idempotent.
    pub fn release_screen(&mut self) {
        if let Some(stream) = self.screen.take() {
            debug!(target: "rc.media", stream_id = %stream.id(), "screen stream released");
            stream.stop_all();
        }
    }

    /// Stop every owned track. Called once on room exit; safe to call even
    /// if acquisition never succeeded, and safe to call again.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(stream) = self.local.take() {
            stream.stop_all();
        }
        if let Some(stream) = self.screen.take() {
            stream.stop_all();
        }
        debug!(target: "rc.media", "media controller torn down");
    }

    /// Whether [`teardown`](Self::teardown) has run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}
