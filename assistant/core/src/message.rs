//! Conversation Messages
//!
//! The in-memory message model for an assistant conversation. This is
//! deliberately distinct from the wire shapes in [`crate::wire`]: a stored
//! message always carries plain text content, while the wire format may split
//! a turn into typed parts (text + image reference).

use serde::{Deserialize, Serialize};

/// Who sent a message
///
/// The in-memory log only ever holds user and assistant turns; the system
/// instruction exists purely on the wire (see [`crate::wire::WireRole`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// AI assistant (Sage)
    Assistant,
}

/// One conversational turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: MessageRole,
    /// Message content (raw model output for assistant turns)
    pub content: String,
    /// When the message was created (Unix timestamp ms)
    pub timestamp_ms: u64,
    /// Embedded image data URL (only on user messages with a photo attached)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether the content matched the reasoning-split heuristic at creation
    /// time. Cached once and never recomputed, so later heuristic changes do
    /// not rewrite history.
    #[serde(default)]
    pub has_reasoning: bool,
}

impl Message {
    /// Create a user message, optionally carrying an attached image
    pub fn user(content: impl Into<String>, image: Option<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp_ms: now_ms(),
            image,
            has_reasoning: false,
        }
    }

    /// Create an assistant message
    ///
    /// `has_reasoning` is decided by the caller (the orchestrator runs the
    /// splitter heuristic exactly once, at creation time).
    pub fn assistant(content: impl Into<String>, has_reasoning: bool) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp_ms: now_ms(),
            image: None,
            has_reasoning,
        }
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
