//! Session error types.
//!
//! Every error here is a recoverable status: device and permission failures
//! degrade a capability flag, `SessionTerminated` and `ParticipantNotFound`
//! are explicit results the UI can display or ignore. Nothing in this core
//! is fatal to the process.

use thiserror::Error;

use crate::media::MediaError;
use crate::roster::RegistryError;

/// Session coordinator error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Device capture failed or was refused; the affected capability is
    /// degraded, the session continues.
    #[error("media error: {0}")]
    Device(#[from] MediaError),

    /// A non-host attempted a host-only operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Intent arrived after the session left the room.
    #[error("session terminated")]
    SessionTerminated,

    /// The referenced participant is not in the roster.
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// The roster reached its configured participant cap.
    #[error("room is full (limit {0})")]
    RoomFull(usize),

    /// Internal coordination failure (closed channel, poisoned state).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// UI-safe status line; internal details stay in the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            SessionError::Device(MediaError::AccessDenied(_)) => {
                "Camera or microphone access was denied".to_string()
            }
            SessionError::Device(MediaError::Unavailable(_)) => {
                "No usable capture device was found".to_string()
            }
            SessionError::Device(MediaError::ShareCancelled) => {
                "Screen sharing was cancelled".to_string()
            }
            SessionError::PermissionDenied(msg) => msg.clone(),
            SessionError::SessionTerminated => "The session has ended".to_string(),
            SessionError::ParticipantNotFound(_) => "Participant not found".to_string(),
            SessionError::RoomFull(_) => "The room is full".to_string(),
            SessionError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<RegistryError> for SessionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => SessionError::ParticipantNotFound(id),
            RegistryError::CapacityExceeded(limit) => SessionError::RoomFull(limit),
            RegistryError::DuplicateId(id) => {
                SessionError::Internal(format!("duplicate participant id {id}"))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = SessionError::Device(MediaError::Unavailable(
            "v4l2 /dev/video0 ioctl failed".to_string(),
        ));
        assert!(!err.client_message().contains("v4l2"));

        let err = SessionError::ParticipantNotFound("p-52f1".to_string());
        assert!(!err.client_message().contains("p-52f1"));

        let err = SessionError::Internal("mailbox closed".to_string());
        assert_eq!(err.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_registry_error_conversion() {
        let err: SessionError = RegistryError::NotFound("p1".to_string()).into();
        assert!(matches!(err, SessionError::ParticipantNotFound(_)));

        let err: SessionError = RegistryError::CapacityExceeded(100).into();
        assert_eq!(err, SessionError::RoomFull(100));
    }

    #[test]
    fn test_media_error_conversion() {
        let err: SessionError = MediaError::ShareCancelled.into();
        assert_eq!(
            err.client_message(),
            "Screen sharing was cancelled".to_string()
        );
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", SessionError::SessionTerminated),
            "session terminated"
        );
        assert_eq!(
            format!("{}", SessionError::RoomFull(8)),
            "room is full (limit 8)"
        );
    }
}
