//! Actor model for session coordination.
//!
//! One `SessionActor` per joined room owns the roster, the chat log, and the
//! media controller; the cloneable [`SessionHandle`] is the UI-facing intent
//! surface. Messages are processed strictly in mailbox order.

mod messages;
mod session;

pub use messages::{Lifecycle, RoomSnapshot, SessionMessage};
pub use session::{LocalIdentity, SessionActor, SessionHandle};
