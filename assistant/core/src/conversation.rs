//! Conversation Store
//!
//! The in-memory, session-scoped log of messages plus the state around a
//! pending model request. Append-only during a session; an explicit clear
//! replaces the whole log with the fixed greeting.
//!
//! Reasoning visibility is a keyed side-table (message index → hidden flag)
//! rather than a field on [`Message`]: messages stay immutable after creation
//! while the user toggles the reasoning panel freely.

use std::collections::HashMap;

use crate::message::{now_ms, Message, MessageRole};

/// Fixed greeting that seeds every conversation
pub const GREETING: &str = "Hi! I'm Sage, the EduPort assistant. How can I help you today?";

/// Token substituted for an empty user submission
pub const EMPTY_SUBMISSION_TEXT: &str = "Hello";

/// Why a submission was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// A request is already in flight
    #[error("a request is already in flight")]
    Busy,
    /// Nothing to send: no text and no image
    #[error("submission is empty")]
    Empty,
}

/// State of the single allowed in-flight request
///
/// `awaiting_first_token` exists purely to drive a distinct loading
/// indicator; it drops as soon as the response arrives, while `busy` gates
/// the submission path for the whole round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingRequest {
    /// A request is in flight; new submissions are rejected
    pub busy: bool,
    /// The response has not started arriving yet
    pub awaiting_first_token: bool,
}

/// An ordered, session-scoped conversation log
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    /// Message index → "reasoning section is hidden" override
    hidden_reasoning: HashMap<usize, bool>,
    pending: PendingRequest,
}

impl Conversation {
    /// Create a conversation seeded with the fixed assistant greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING, false)],
            hidden_reasoning: HashMap::new(),
            pending: PendingRequest::default(),
        }
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the log
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// A conversation is never empty (the greeting is always present)
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether a request is currently in flight
    pub fn is_busy(&self) -> bool {
        self.pending.busy
    }

    /// Whether the in-flight request has produced nothing yet
    pub fn awaiting_first_token(&self) -> bool {
        self.pending.awaiting_first_token
    }

    /// Current pending-request state
    pub fn pending(&self) -> PendingRequest {
        self.pending
    }

    /// Begin a user submission
    ///
    /// Appends the provisional user message and marks the conversation busy.
    /// Rejected while a request is in flight, or when both the text and the
    /// image are empty; the log is untouched in either case.
    pub fn begin_submission(
        &mut self,
        text: &str,
        image: Option<String>,
    ) -> Result<(), SubmitError> {
        if self.pending.busy {
            tracing::debug!("submission rejected: request already in flight");
            return Err(SubmitError::Busy);
        }
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Err(SubmitError::Empty);
        }

        let content = if text.is_empty() {
            EMPTY_SUBMISSION_TEXT
        } else {
            text
        };
        self.push(Message::user(content, image));
        self.pending = PendingRequest {
            busy: true,
            awaiting_first_token: true,
        };
        Ok(())
    }

    /// Record the assistant's reply and return to idle
    ///
    /// `has_reasoning` comes from the splitter heuristic, run exactly once by
    /// the caller. Messages with a reasoning section start hidden.
    pub fn push_assistant(&mut self, content: impl Into<String>, has_reasoning: bool) {
        let msg = Message::assistant(content, has_reasoning);
        self.push(msg);
        if has_reasoning {
            self.hidden_reasoning.insert(self.messages.len() - 1, true);
        }
        self.pending = PendingRequest::default();
    }

    /// Reset to the single greeting
    ///
    /// Does not touch the pending-request state: if a request is in flight
    /// its eventual result is simply appended to the cleared conversation.
    /// Accepted race, see the crate docs.
    pub fn clear(&mut self) {
        self.messages = vec![Message::assistant(GREETING, false)];
        self.hidden_reasoning.clear();
        tracing::debug!("conversation cleared");
    }

    /// Whether the reasoning section of the message at `index` is hidden
    ///
    /// Defaults to hidden for any message whose `has_reasoning` flag is set;
    /// always false for messages without a reasoning section.
    pub fn is_reasoning_hidden(&self, index: usize) -> bool {
        let Some(msg) = self.messages.get(index) else {
            return false;
        };
        if !msg.has_reasoning {
            return false;
        }
        self.hidden_reasoning.get(&index).copied().unwrap_or(true)
    }

    /// Toggle reasoning visibility for the message at `index`
    pub fn toggle_reasoning(&mut self, index: usize) {
        let hidden = self.is_reasoning_hidden(index);
        if self.messages.get(index).is_some_and(|m| m.has_reasoning) {
            self.hidden_reasoning.insert(index, !hidden);
        }
    }

    /// Append a message, keeping timestamps monotonically non-decreasing
    fn push(&mut self, mut msg: Message) {
        if let Some(last) = self.messages.last() {
            if msg.timestamp_ms < last.timestamp_ms {
                msg.timestamp_ms = last.timestamp_ms;
            }
        }
        self.messages.push(msg);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
