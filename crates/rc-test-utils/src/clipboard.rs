//! Recording clipboard sink.

use std::sync::Mutex;

use room_controller::room::{ClipboardError, ClipboardSink};

/// Clipboard fake that records copied text, or fails when scripted.
pub struct FakeClipboard {
    copied: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self {
            copied: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A clipboard that rejects every copy.
    pub fn unavailable() -> Self {
        Self {
            copied: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Everything copied so far, in copy order.
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().unwrap().clone()
    }
}

impl Default for FakeClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSink for FakeClipboard {
    fn copy_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Unavailable("no clipboard".to_string()));
        }
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
