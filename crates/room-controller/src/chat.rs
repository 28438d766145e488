//! Append-only chat log scoped to one room session.
//!
//! User messages come from UI intent; system messages narrate
//! roster-visible lifecycle events (join, leave, forced mute, kick) and are
//! emitted only by the session coordinator. The log is discarded with the
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on message content, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;

/// Message origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    System,
}

/// One chat entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Monotonically increasing within the log; later messages have later ids.
    pub id: u64,
    pub kind: MessageKind,
    /// Present for `User` messages, absent for `System`.
    pub author_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Clock-style display time (e.g. "14:05") for message rendering.
    #[must_use]
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Ordered, append-only message history.
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    next_id: u64,
    max_chars: usize,
}

impl ChatLog {
    /// Create an empty log with a per-message character cap.
    #[must_use]
    pub fn new(max_chars: usize) -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            max_chars,
        }
    }

    /// Append a user message.
    ///
    /// Content is trimmed of surrounding whitespace; messages that trim to
    /// empty are rejected (`None`). Content beyond the cap is truncated on a
    /// character boundary.
    pub fn append_user(&mut self, author: &str, content: &str) -> Option<&ChatMessage> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        let content = Self::truncate(trimmed, self.max_chars);
        Some(self.push(MessageKind::User, Some(author.to_string()), content))
    }

    /// Append a lifecycle system message. Always accepted.
    pub fn append_system(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(MessageKind::System, None, content.into())
    }

    /// Ordered view of the log for rendering.
    #[must_use]
    pub fn snapshot(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[allow(clippy::unwrap_used)] // the entry was pushed on the line above
    fn push(&mut self, kind: MessageKind, author_name: Option<String>, content: String) -> &ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            kind,
            author_name,
            content,
            timestamp: Utc::now(),
        };
        self.next_id += 1;
        self.messages.push(message);
        self.messages.last().unwrap()
    }

    fn truncate(content: &str, max_chars: usize) -> String {
        if content.chars().count() <= max_chars {
            content.to_string()
        } else {
            content.chars().take(max_chars).collect()
        }
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_CHARS)
    }
}
