//! EduPort Core - Headless Assistant Chat for the EduPort Portal
//!
//! This crate provides the conversation-assembly and response-formatting
//! pipeline behind the portal's AI chat surface, completely independent of
//! any UI framework. It can drive a web front end, a TUI, or run headless
//! for testing.
//!
//! # Architecture
//!
//! ```text
//! Image Intake ──► Conversation Store ──► Outbound Message Builder
//!                                              │
//!                                              ▼
//!                                   Model Request Orchestrator
//!                                              │        (external model)
//!                                              ▼
//!                                  Thinking/Answer Splitter
//!                                              │
//!                                              ▼
//!                                      Content Formatter ──► display
//! ```
//!
//! # Key Types
//!
//! - [`ChatSession`]: one user-facing session; owns the conversation, the
//!   model variant, and the single allowed in-flight request
//! - [`Conversation`]: session-scoped append-only message log
//! - [`DisplayBlock`]: structured render output of the Content Formatter
//! - [`ChatBackend`]: provider abstraction for the model endpoint
//! - [`SchoolClient`]: the portal's school-system data aggregation proxy
//!
//! # Concurrency Model
//!
//! One conversation is manipulated by one interactive session at a time.
//! The only suspension points are the image re-encode and the model round
//! trip; both are single awaited operations with no partial delivery. The
//! `busy` flag provides natural backpressure of at most one outstanding
//! model call. Clearing the conversation while a request is outstanding is
//! an accepted race: the late result is appended to the new conversation.
//!
//! # Fail-soft
//!
//! Provider failures never surface as errors to chat callers; the
//! orchestrator is the single boundary that maps them to a fixed apology
//! turn. See [`orchestrator`].

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod conversation;
pub mod format;
pub mod intake;
pub mod message;
pub mod orchestrator;
pub mod reasoning;
pub mod school;
pub mod wire;

// Re-exports for convenience
pub use backend::{ChatBackend, CompletionRequest, CompletionResponse, OpenAiBackend};
pub use conversation::{Conversation, PendingRequest, SubmitError, EMPTY_SUBMISSION_TEXT, GREETING};
pub use format::{format, DisplayBlock, InlineSpan};
pub use intake::{validate_and_encode, EncodedImage, IntakeError};
pub use message::{Message, MessageRole};
pub use orchestrator::{
    sanitize_messages, system_prompt, ChatSession, ModelVariant, OrchestratorConfig, APOLOGY,
    MAX_IMAGE_PAYLOAD_BYTES, OVERSIZE_IMAGE_TEXT,
};
pub use reasoning::{has_reasoning_section, split, ReasoningSplit};
pub use school::{Credentials, SchoolClient, SchoolError, StudentReport};
pub use wire::{
    build_outbound, ContentPart, ImageUrl, WireContent, WireMessage, WireRole,
    DEFAULT_IMAGE_PROMPT,
};
