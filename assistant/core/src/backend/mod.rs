//! Model Backend
//!
//! Provider abstraction for the external model endpoint. The trait keeps the
//! orchestrator independent of any one provider; the shipped implementation
//! talks to an OpenAI-compatible chat-completions API.

mod openai;
mod traits;

pub use openai::OpenAiBackend;
pub use traits::{ChatBackend, CompletionRequest, CompletionResponse};
