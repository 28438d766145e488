//! Greenroom Room Controller Library
//!
//! This library provides the client-side session core for a Greenroom
//! video-conferencing room:
//!
//! - Local device stream ownership (camera/mic and screen capture)
//! - Participant roster with host privileges and capability flags
//! - Per-room session actor coordinating intents, media, and signaling
//! - Append-only chat log with lifecycle system messages
//! - Room id generation and share-link handling
//!
//! # Architecture
//!
//! One actor per joined room:
//!
//! ```text
//! SessionActor (one per joined room)
//! ├── owns ParticipantRegistry (roster + flags)
//! ├── owns MediaController (exclusive device-stream owner)
//! ├── owns ChatLog
//! ├── consumes SignalingEvents (inbound mpsc)
//! └── publishes RoomUpdates (injected SignalingChannel)
//! ```
//!
//! UI intents go through the cloneable [`actors::SessionHandle`]; every
//! mutation is serialized through the actor's mailbox, so there are no
//! locks on session state and no torn reads.
//!
//! # Key Design Decisions
//!
//! - **Exclusive stream ownership**: only the [`media::MediaController`]
//!   starts or stops device tracks; the roster holds display handles
//! - **Degraded join**: denied device permission still yields an active
//!   session (camera off, muted) rather than an error page
//! - **Host checks in the core**: force-mute and kick are authorized here,
//!   never in the UI layer
//! - **Injected capabilities**: capture, signaling, and clipboard are
//!   traits, so the core runs identically under tests and real transports
//!
//! # Modules
//!
//! - [`actors`] - Session actor and its handle
//! - [`media`] - Streams, tracks, constraints, and the media controller
//! - [`roster`] - Participant registry
//! - [`chat`] - Chat log
//! - [`room`] - Room ids, share links, clipboard
//! - [`config`] - Session configuration from environment
//! - [`signaling`] - Signaling channel seam
//! - [`errors`] - Session error taxonomy

pub mod actors;
pub mod chat;
pub mod config;
pub mod errors;
pub mod media;
pub mod room;
pub mod roster;
pub mod signaling;
