//! Model Request Orchestrator
//!
//! Owns the single request/response cycle against the model backend:
//! variant-driven model selection, system instruction assembly, the
//! request-size guard for embedded images, and the fail-soft mapping of
//! every provider failure to a fixed apology message.
//!
//! # Fail-soft policy
//!
//! Nothing above this module ever receives an error value for a chat flow.
//! Transport failures, non-success statuses, and malformed payloads all
//! resolve to a valid conversational turn containing [`APOLOGY`]. The only
//! errors a caller sees are synchronous input rejections
//! ([`SubmitError`](crate::conversation::SubmitError)).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{ChatBackend, CompletionRequest};
use crate::conversation::{Conversation, SubmitError, EMPTY_SUBMISSION_TEXT};
use crate::intake::EncodedImage;
use crate::message::Message;
use crate::reasoning;
use crate::wire::{build_outbound, ContentPart, WireContent, WireMessage};

/// Fixed apology appended when the provider call fails in any way
pub const APOLOGY: &str =
    "Sorry, something went wrong while handling your request. Please try again.";

/// Substituted for an image part whose payload exceeds the request ceiling
pub const OVERSIZE_IMAGE_TEXT: &str =
    "[Image is too large to process. Please use a smaller image (up to 4MB).]";

/// Ceiling on an embedded image's base64 payload, in bytes
pub const MAX_IMAGE_PAYLOAD_BYTES: usize = 4_500_000;

/// Base system instructions, always included
const BASE_SYSTEM_PROMPT: &str = "\
You are Sage, the smart AI assistant of the EduPort learning platform.

Core rules:
- ALWAYS answer the question that was asked, directly and precisely; never change the subject.
- ALWAYS read the user's request and any attached images carefully.
- If the user sent an image, you MUST describe in detail what it shows.

Style:
- Friendly, polite, and helpful.
- Brief and to the point, ready to elaborate when asked.
- Use **bold text** for important information (wrap it in double asterisks).
- Structure your answers well: separate paragraphs with blank lines and use lists where appropriate.";

/// Additional directives appended for the reasoning variant
const REASONING_ADDENDUM: &str = "\
Additional instructions for reasoning mode:
- Always begin your reply with an \"**Analysis:**\" section where you think out loud.
- After the analysis, add an \"**Answer:**\" section with a short, clear answer.
- IMPORTANT: do NOT use <think>...</think> formatting; use ONLY \"**Analysis:**\" and \"**Answer:**\".
- Keep the analysis detailed and interesting, roughly 100-200 words.
- Your analysis and answer must address exactly the question that was asked.";

/// Which model variant a request targets
///
/// Session-scoped and user-toggleable. Switching the variant does not
/// rewrite past messages' reasoning flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ModelVariant {
    /// General-purpose instruction-following model
    #[default]
    #[serde(rename = "default")]
    Standard,
    /// Vision-and-reasoning-capable model
    #[serde(rename = "thinking")]
    Reasoning,
}

impl<'de> Deserialize<'de> for ModelVariant {
    // Unknown or unset variants fall back to standard rather than failing
    // the whole request.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "thinking" => Self::Reasoning,
            _ => Self::Standard,
        })
    }
}

impl ModelVariant {
    /// Toggle between the two variants
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Standard => Self::Reasoning,
            Self::Reasoning => Self::Standard,
        }
    }
}

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Model id for the standard variant
    pub model_standard: String,
    /// Model id for the reasoning variant
    pub model_reasoning: String,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_standard: "chutesai/Mistral-Small-3.1-24B-Instruct-2503".to_string(),
            model_reasoning: "moonshotai/Kimi-VL-A3B-Thinking".to_string(),
            max_tokens: 2048,
            temperature: 0.5,
        }
    }
}

impl OrchestratorConfig {
    /// Create configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_standard: std::env::var("EDUPORT_MODEL_STANDARD")
                .unwrap_or(defaults.model_standard),
            model_reasoning: std::env::var("EDUPORT_MODEL_REASONING")
                .unwrap_or(defaults.model_reasoning),
            max_tokens: std::env::var("EDUPORT_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            temperature: std::env::var("EDUPORT_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
        }
    }

    /// Model id for a variant
    pub fn model_for(&self, variant: ModelVariant) -> &str {
        match variant {
            ModelVariant::Standard => &self.model_standard,
            ModelVariant::Reasoning => &self.model_reasoning,
        }
    }
}

/// System instructions for a variant
#[must_use]
pub fn system_prompt(variant: ModelVariant) -> String {
    match variant {
        ModelVariant::Standard => BASE_SYSTEM_PROMPT.to_string(),
        ModelVariant::Reasoning => format!("{BASE_SYSTEM_PROMPT}\n\n{REASONING_ADDENDUM}"),
    }
}

/// Apply the request-size guard and part normalization to outbound messages
///
/// - An `image_url` part whose `data:image/…` base64 payload exceeds
///   [`MAX_IMAGE_PAYLOAD_BYTES`] is replaced with an explanatory text part;
///   the request still proceeds.
/// - A message whose part list ends up empty gets the default greeting part.
///
/// Plain-text messages pass through untouched.
pub fn sanitize_messages(messages: Vec<WireMessage>) -> Vec<WireMessage> {
    messages
        .into_iter()
        .map(|msg| match msg.content {
            WireContent::Text(_) => msg,
            WireContent::Parts(parts) => {
                let mut sanitized: Vec<ContentPart> = parts
                    .into_iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => ContentPart::Text { text },
                        ContentPart::ImageUrl { image_url } => {
                            if oversized_data_url(&image_url.url) {
                                tracing::warn!(
                                    kib = image_url.url.len() / 1024,
                                    "embedded image over request ceiling, substituting notice"
                                );
                                ContentPart::Text {
                                    text: OVERSIZE_IMAGE_TEXT.to_string(),
                                }
                            } else {
                                ContentPart::ImageUrl { image_url }
                            }
                        }
                    })
                    .collect();
                if sanitized.is_empty() {
                    sanitized.push(ContentPart::Text {
                        text: EMPTY_SUBMISSION_TEXT.to_string(),
                    });
                }
                WireMessage {
                    role: msg.role,
                    content: WireContent::Parts(sanitized),
                }
            }
        })
        .collect()
}

/// Whether a data URL's base64 payload exceeds the request ceiling
fn oversized_data_url(url: &str) -> bool {
    if !url.starts_with("data:image/") {
        return false;
    }
    let payload_len = url
        .find(',')
        .map(|comma| url.len() - comma - 1)
        .unwrap_or(url.len());
    payload_len > MAX_IMAGE_PAYLOAD_BYTES
}

/// One user-facing chat session: conversation + variant + backend
///
/// Implements the idle → busy → idle state machine around the single
/// allowed in-flight request. All mutation happens on this struct in the
/// session's sequential event flow; no locks are needed.
pub struct ChatSession<B: ChatBackend> {
    config: OrchestratorConfig,
    backend: Arc<B>,
    conversation: Conversation,
    variant: ModelVariant,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Create a session with a fresh conversation
    pub fn new(backend: B, config: OrchestratorConfig) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            conversation: Conversation::new(),
            variant: ModelVariant::Standard,
        }
    }

    /// The conversation log
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Active model variant
    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    /// Switch between standard and reasoning variants
    ///
    /// Past messages keep their cached reasoning flags.
    pub fn toggle_variant(&mut self) {
        self.variant = self.variant.toggled();
        tracing::debug!(variant = ?self.variant, "model variant switched");
    }

    /// Reset the conversation to the greeting
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Toggle reasoning visibility for a message
    pub fn toggle_reasoning(&mut self, index: usize) {
        self.conversation.toggle_reasoning(index);
    }

    /// Submit a user turn and await the assistant's reply
    ///
    /// Synchronous rejections (busy, empty) surface as `Err`; everything
    /// past that point is fail-soft and always yields an assistant message.
    /// Returns the index of the appended assistant message.
    pub async fn submit(
        &mut self,
        text: &str,
        image: Option<&EncodedImage>,
    ) -> Result<usize, SubmitError> {
        self.conversation
            .begin_submission(text, image.map(|i| i.data_url.clone()))?;

        let outbound = build_outbound(
            self.conversation.messages(),
            text,
            image.map(|i| i.data_url.as_str()),
            &system_prompt(self.variant),
        );
        let outbound = sanitize_messages(outbound);

        let request = CompletionRequest::new(self.config.model_for(self.variant), outbound)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        let (content, has_reasoning) = match self.backend.complete(&request).await {
            Ok(response) => {
                tracing::debug!(
                    backend = self.backend.name(),
                    model = %response.model,
                    duration_ms = ?response.duration_ms,
                    "model response received"
                );
                let has = reasoning::has_reasoning_section(&response.content);
                (response.content, has)
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "model request failed, substituting apology");
                (APOLOGY.to_string(), false)
            }
        };

        self.conversation.push_assistant(content, has_reasoning);
        Ok(self.conversation.len() - 1)
    }

    /// The last message in the conversation
    pub fn last_message(&self) -> &Message {
        // A conversation always holds at least the greeting.
        let messages = self.conversation.messages();
        &messages[messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::wire::{ImageUrl, WireRole};

    #[test]
    fn test_variant_parsing() {
        let v: ModelVariant = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(v, ModelVariant::Standard);
        let v: ModelVariant = serde_json::from_str("\"thinking\"").unwrap();
        assert_eq!(v, ModelVariant::Reasoning);
        // Unknown variants fall back to standard
        let v: ModelVariant = serde_json::from_str("\"experimental\"").unwrap();
        assert_eq!(v, ModelVariant::Standard);
    }

    #[test]
    fn test_variant_toggle() {
        assert_eq!(ModelVariant::Standard.toggled(), ModelVariant::Reasoning);
        assert_eq!(ModelVariant::Reasoning.toggled(), ModelVariant::Standard);
    }

    #[test]
    fn test_model_selection() {
        let config = OrchestratorConfig::default();
        assert!(config.model_for(ModelVariant::Standard).contains("Mistral"));
        assert!(config.model_for(ModelVariant::Reasoning).contains("Thinking"));
    }

    #[test]
    fn test_reasoning_prompt_demands_labeled_sections() {
        let prompt = system_prompt(ModelVariant::Reasoning);
        assert!(prompt.contains("**Analysis:**"));
        assert!(prompt.contains("**Answer:**"));
        assert!(prompt.contains("<think>"));
        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));

        let base = system_prompt(ModelVariant::Standard);
        assert!(!base.contains("**Analysis:**"));
    }

    #[test]
    fn test_oversize_image_substituted() {
        let big = format!("data:image/jpeg;base64,{}", "A".repeat(MAX_IMAGE_PAYLOAD_BYTES + 1));
        let messages = vec![WireMessage::parts(
            WireRole::User,
            vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: big },
                },
                ContentPart::Text {
                    text: "what is this".to_string(),
                },
            ],
        )];

        let sanitized = sanitize_messages(messages);
        match &sanitized[0].content {
            WireContent::Parts(parts) => {
                assert_eq!(
                    parts[0],
                    ContentPart::Text {
                        text: OVERSIZE_IMAGE_TEXT.to_string()
                    }
                );
                assert_eq!(
                    parts[1],
                    ContentPart::Text {
                        text: "what is this".to_string()
                    }
                );
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_small_image_passes_guard() {
        let small = format!("data:image/jpeg;base64,{}", "A".repeat(1000));
        let messages = vec![WireMessage::parts(
            WireRole::User,
            vec![ContentPart::ImageUrl {
                image_url: ImageUrl { url: small.clone() },
            }],
        )];
        let sanitized = sanitize_messages(messages);
        match &sanitized[0].content {
            WireContent::Parts(parts) => {
                assert_eq!(
                    parts[0],
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: small }
                    }
                );
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_image_url_not_size_guarded() {
        // Only embedded data URLs count against the payload ceiling.
        let url = format!("https://example.com/{}", "a".repeat(100));
        assert!(!oversized_data_url(&url));
    }

    #[test]
    fn test_empty_part_list_gets_default_greeting() {
        let messages = vec![WireMessage::parts(WireRole::User, Vec::new())];
        let sanitized = sanitize_messages(messages);
        match &sanitized[0].content {
            WireContent::Parts(parts) => {
                assert_eq!(
                    parts,
                    &vec![ContentPart::Text {
                        text: EMPTY_SUBMISSION_TEXT.to_string()
                    }]
                );
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_messages_untouched() {
        let messages = vec![WireMessage::text(WireRole::Assistant, "hello")];
        let sanitized = sanitize_messages(messages.clone());
        assert_eq!(sanitized, messages);
    }
}
