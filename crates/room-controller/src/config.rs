//! Room session configuration.
//!
//! Loaded from environment variables with sensible defaults; everything here
//! is tunable without code changes but none of it is secret.

use std::collections::HashMap;
use std::env;

use thiserror::Error;

use crate::media::MediaConstraints;

/// Default camera capture: 1280x720 @ 30fps.
pub const DEFAULT_CAMERA_WIDTH: u32 = 1280;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 720;
pub const DEFAULT_CAMERA_FRAME_RATE: u32 = 30;

/// Default screen capture: 1920x1080 @ 30fps.
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;
pub const DEFAULT_SCREEN_FRAME_RATE: u32 = 30;

/// Default per-message character cap.
pub const DEFAULT_CHAT_MAX_CHARS: usize = 500;

/// Default roster bound.
pub const DEFAULT_MAX_PARTICIPANTS: usize = 100;

/// Default room-id token length (base-36 characters).
pub const DEFAULT_ROOM_ID_LENGTH: usize = 13;

/// Minimum accepted room-id length; collision probability below this is no
/// longer negligible.
pub const MIN_ROOM_ID_LENGTH: usize = 10;

/// Default signaling collaborator endpoint.
pub const DEFAULT_SIGNALING_URL: &str = "wss://localhost:8443/signaling";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Room session configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Ideal camera capture width, pixels.
    pub camera_width: u32,
    /// Ideal camera capture height, pixels.
    pub camera_height: u32,
    /// Ideal camera frame rate.
    pub camera_frame_rate: u32,

    /// Ideal screen capture width, pixels.
    pub screen_width: u32,
    /// Ideal screen capture height, pixels.
    pub screen_height: u32,
    /// Ideal screen frame rate.
    pub screen_frame_rate: u32,

    /// Per-message character cap for the chat log.
    pub chat_max_chars: usize,

    /// Roster bound, local user included.
    pub max_participants: usize,

    /// Room-id token length (minimum [`MIN_ROOM_ID_LENGTH`]).
    pub room_id_length: usize,

    /// Signaling collaborator endpoint. Carried for whoever constructs the
    /// channel; the core never dials it.
    pub signaling_url: String,
}

impl RoomConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when a provided override fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// `InvalidValue` when a provided override fails validation.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let camera_width = parse_or(vars, "ROOM_CAMERA_WIDTH", DEFAULT_CAMERA_WIDTH)?;
        let camera_height = parse_or(vars, "ROOM_CAMERA_HEIGHT", DEFAULT_CAMERA_HEIGHT)?;
        let camera_frame_rate = parse_or(vars, "ROOM_CAMERA_FRAME_RATE", DEFAULT_CAMERA_FRAME_RATE)?;
        let screen_width = parse_or(vars, "ROOM_SCREEN_WIDTH", DEFAULT_SCREEN_WIDTH)?;
        let screen_height = parse_or(vars, "ROOM_SCREEN_HEIGHT", DEFAULT_SCREEN_HEIGHT)?;
        let screen_frame_rate = parse_or(vars, "ROOM_SCREEN_FRAME_RATE", DEFAULT_SCREEN_FRAME_RATE)?;
        let chat_max_chars = parse_or(vars, "ROOM_CHAT_MAX_CHARS", DEFAULT_CHAT_MAX_CHARS)?;
        let max_participants = parse_or(vars, "ROOM_MAX_PARTICIPANTS", DEFAULT_MAX_PARTICIPANTS)?;
        let room_id_length = parse_or(vars, "ROOM_ID_LENGTH", DEFAULT_ROOM_ID_LENGTH)?;

        let signaling_url = vars
            .get("ROOM_SIGNALING_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SIGNALING_URL.to_string());

        let config = Self {
            camera_width,
            camera_height,
            camera_frame_rate,
            screen_width,
            screen_height,
            screen_frame_rate,
            chat_max_chars,
            max_participants,
            room_id_length,
            signaling_url,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.room_id_length < MIN_ROOM_ID_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "ROOM_ID_LENGTH must be at least {MIN_ROOM_ID_LENGTH}, got {}",
                self.room_id_length
            )));
        }
        if self.chat_max_chars == 0 {
            return Err(ConfigError::InvalidValue(
                "ROOM_CHAT_MAX_CHARS must be positive".to_string(),
            ));
        }
        if self.max_participants == 0 {
            return Err(ConfigError::InvalidValue(
                "ROOM_MAX_PARTICIPANTS must be positive".to_string(),
            ));
        }
        if self.camera_frame_rate == 0 || self.screen_frame_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "frame rates must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Camera + microphone constraint set.
    #[must_use]
    pub fn camera_constraints(&self) -> MediaConstraints {
        MediaConstraints::camera(self.camera_width, self.camera_height, self.camera_frame_rate)
    }

    /// Screen-capture constraint set.
    #[must_use]
    pub fn screen_constraints(&self) -> MediaConstraints {
        MediaConstraints::screen(self.screen_width, self.screen_height, self.screen_frame_rate)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            camera_width: DEFAULT_CAMERA_WIDTH,
            camera_height: DEFAULT_CAMERA_HEIGHT,
            camera_frame_rate: DEFAULT_CAMERA_FRAME_RATE,
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            screen_frame_rate: DEFAULT_SCREEN_FRAME_RATE,
            chat_max_chars: DEFAULT_CHAT_MAX_CHARS,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            room_id_length: DEFAULT_ROOM_ID_LENGTH,
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}: cannot parse {raw:?}"))),
    }
}
