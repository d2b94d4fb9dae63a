//! Backend Traits
//!
//! Trait definition for model backends. This abstraction lets the
//! orchestrator work against different providers (and against mocks in
//! tests) without changing core logic.

use async_trait::async_trait;
use serde::Serialize;

use crate::wire::WireMessage;

/// A single request/response completion call
///
/// Serializes directly into the provider's request body.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Ordered wire messages, system instruction first
    pub messages: Vec<WireMessage>,
    /// Maximum tokens in the response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Streaming is never requested; responses are delivered whole
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a request with the fixed provider parameters
    pub fn new(model: impl Into<String>, messages: Vec<WireMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: 2048,
            temperature: 0.5,
            stream: false,
        }
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }
}

/// Response from a completion call
#[derive(Clone, Debug)]
pub struct CompletionResponse {
    /// The response text
    pub content: String,
    /// Model that generated the response
    pub model: String,
    /// Round-trip time in milliseconds
    pub duration_ms: Option<u64>,
}

/// Model backend trait
///
/// Implement this to add support for a different provider. Errors are plain
/// `anyhow` values here; the orchestrator is the single place that maps them
/// to the fail-soft apology.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Whether the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a request and wait for the complete response
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<CompletionResponse>;
}
