//! Room identifiers, share links, and the clipboard capability.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Clipboard failure. Best-effort: reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Injected clipboard capability.
///
/// A desktop embedding backs this with a system clipboard crate; tests use
/// the fake in `rc-test-utils`.
pub trait ClipboardSink: Send + Sync {
    /// Place `text` on the clipboard.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the platform clipboard cannot be reached.
    fn copy_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Generate a random base-36 room token of `length` characters.
///
/// At 10+ characters the collision probability is negligible; no
/// server-side uniqueness check is performed.
#[must_use]
pub fn generate_room_id(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let digit = rng.gen_range(0..36u32);
            char::from_digit(digit, 36).unwrap_or('0')
        })
        .collect()
}

/// Shareable link for a room.
#[must_use]
pub fn room_link(origin: &str, room_id: &str) -> String {
    format!("{origin}/?room={room_id}")
}

/// Extract the room id from a link or query string, if present.
#[must_use]
pub fn room_id_from_link(url: &str) -> Option<String> {
    let query = url.split_once('?').map_or(url, |(_, query)| query);
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("room="))
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Copy a room link to the clipboard, best-effort.
///
/// Returns whether the copy succeeded; failure is logged and non-fatal.
pub fn copy_room_link(clipboard: &dyn ClipboardSink, origin: &str, room_id: &str) -> bool {
    let link = room_link(origin, room_id);
    match clipboard.copy_text(&link) {
        Ok(()) => {
            debug!(target: "rc.room", room_id = %room_id, "room link copied");
            true
        }
        Err(err) => {
            warn!(target: "rc.room", room_id = %room_id, error = %err, "room link copy failed");
            false
        }
    }
}
