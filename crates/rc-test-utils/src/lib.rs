//! # RC Test Utilities
//!
//! Shared test utilities for the Room Controller (RC) session core.
//!
//! This crate provides:
//! - `FakeMediaSource` - scriptable capture capability (grant, deny,
//!   unavailable, cancelled, gated)
//! - `FakeSignaling` - recording signaling channel plus event injection
//! - `FakeClipboard` - recording clipboard sink
//! - Participant fixtures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rc_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let source = Arc::new(FakeMediaSource::new().deny_camera());
//!     let (signaling, events_tx, events_rx) = signaling_pair();
//!     // ... spawn a SessionActor against the fakes ...
//! }
//! ```

pub mod clipboard;
pub mod fixtures;
pub mod media;
pub mod signaling;

// Re-export commonly used items
pub use clipboard::*;
pub use fixtures::*;
pub use media::*;
pub use signaling::*;
