//! Wire Messages
//!
//! The JSON shapes exchanged with the model endpoint, distinct from the
//! stored [`Message`](crate::message::Message) model, plus the Outbound
//! Message Builder that turns conversation state into a request payload.
//!
//! A wire message content is either a plain string or a sequence of typed
//! parts; the part sequence is only used for the one turn that carries an
//! image.

use serde::{Deserialize, Serialize};

use crate::conversation::EMPTY_SUBMISSION_TEXT;
use crate::message::Message;

/// Default prompt when an image is submitted without text
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe what you see in this photo.";

/// Role of a wire message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    /// System instructions, always the leading message
    System,
    /// User turn
    User,
    /// Assistant turn
    Assistant,
}

impl From<crate::message::MessageRole> for WireRole {
    fn from(role: crate::message::MessageRole) -> Self {
        match role {
            crate::message::MessageRole::User => Self::User,
            crate::message::MessageRole::Assistant => Self::Assistant,
        }
    }
}

/// One typed part of a multi-part message content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text part
    Text {
        /// The text
        text: String,
    },
    /// An image reference part
    ImageUrl {
        /// The image location (a `data:` URL for embedded images)
        image_url: ImageUrl,
    },
}

/// Image location wrapper, matching the provider's nested shape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// The URL itself
    pub url: String,
}

/// Wire message content: plain text or typed parts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    /// Plain string content
    Text(String),
    /// Part sequence (used for image-carrying turns)
    Parts(Vec<ContentPart>),
}

/// One message in the model request payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Who the message is attributed to
    pub role: WireRole,
    /// The content
    pub content: WireContent,
}

impl WireMessage {
    /// Plain-text message
    pub fn text(role: WireRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: WireContent::Text(content.into()),
        }
    }

    /// Multi-part message
    pub fn parts(role: WireRole, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: WireContent::Parts(parts),
        }
    }
}

/// Build the ordered wire messages for one request
///
/// `history` is the conversation log *after* the provisional user message was
/// appended optimistically. The builder repairs that:
///
/// - without an image, every prior turn is forwarded and the final entry is
///   overwritten with the freshly composed text (or the fixed greeting token
///   when empty);
/// - with an image, the provisional entry is dropped and one new two-part
///   message is appended: the image reference first, then the text (or the
///   default photo prompt when empty).
///
/// The system instruction always leads. Order is preserved and at most one
/// message carries image content.
pub fn build_outbound(
    history: &[Message],
    user_text: &str,
    image: Option<&str>,
    system_prompt: &str,
) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(history.len() + 1);
    wire.push(WireMessage::text(WireRole::System, system_prompt));

    let user_text = user_text.trim();

    match image {
        None => {
            for msg in history {
                wire.push(WireMessage::text(msg.role.into(), msg.content.clone()));
            }
            let content = if user_text.is_empty() {
                EMPTY_SUBMISSION_TEXT
            } else {
                user_text
            };
            // Overwrite the provisional last entry with the composed text.
            if let Some(last) = wire.last_mut() {
                *last = WireMessage::text(WireRole::User, content);
            }
        }
        Some(image) => {
            let keep = history.len().saturating_sub(1);
            for msg in &history[..keep] {
                wire.push(WireMessage::text(msg.role.into(), msg.content.clone()));
            }
            let text = if user_text.is_empty() {
                DEFAULT_IMAGE_PROMPT
            } else {
                user_text
            };
            wire.push(WireMessage::parts(
                WireRole::User,
                vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_string(),
                        },
                    },
                    ContentPart::Text {
                        text: text.to_string(),
                    },
                ],
            ));
        }
    }

    wire
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::message::Message;

    fn history_with_provisional(user_text: &str) -> Vec<Message> {
        vec![
            Message::assistant("hi", false),
            Message::user(user_text, None),
        ]
    }

    #[test]
    fn test_text_only_replaces_provisional_entry() {
        let history = history_with_provisional("hello");
        let wire = build_outbound(&history, "hello", None, "<base>");

        assert_eq!(
            wire,
            vec![
                WireMessage::text(WireRole::System, "<base>"),
                WireMessage::text(WireRole::Assistant, "hi"),
                WireMessage::text(WireRole::User, "hello"),
            ]
        );
    }

    #[test]
    fn test_empty_text_defaults_to_greeting_token() {
        let history = history_with_provisional(EMPTY_SUBMISSION_TEXT);
        let wire = build_outbound(&history, "  ", None, "sys");
        assert_eq!(
            wire.last().unwrap(),
            &WireMessage::text(WireRole::User, EMPTY_SUBMISSION_TEXT)
        );
    }

    #[test]
    fn test_image_turn_drops_provisional_and_appends_parts() {
        let mut history = history_with_provisional("look");
        history[1].image = Some("data:image/jpeg;base64,AAAA".to_string());

        let wire = build_outbound(&history, "look", Some("data:image/jpeg;base64,AAAA"), "sys");

        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1], WireMessage::text(WireRole::Assistant, "hi"));
        assert_eq!(
            wire[2],
            WireMessage::parts(
                WireRole::User,
                vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/jpeg;base64,AAAA".to_string()
                        }
                    },
                    ContentPart::Text {
                        text: "look".to_string()
                    },
                ]
            )
        );
    }

    #[test]
    fn test_image_without_text_uses_default_prompt() {
        let history = history_with_provisional(EMPTY_SUBMISSION_TEXT);
        let wire = build_outbound(&history, "", Some("data:image/jpeg;base64,AAAA"), "sys");

        match &wire.last().unwrap().content {
            WireContent::Parts(parts) => {
                assert_eq!(
                    parts[1],
                    ContentPart::Text {
                        text: DEFAULT_IMAGE_PROMPT.to_string()
                    }
                );
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_at_most_one_image_per_call() {
        let history = history_with_provisional("look");
        let wire = build_outbound(&history, "look", Some("data:image/jpeg;base64,AAAA"), "sys");
        let image_turns = wire
            .iter()
            .filter(|m| {
                matches!(&m.content, WireContent::Parts(parts)
                    if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
            })
            .count();
        assert_eq!(image_turns, 1);
    }

    #[test]
    fn test_wire_json_shapes() {
        let msg = WireMessage::parts(
            WireRole::User,
            vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/jpeg;base64,AAAA".to_string(),
                    },
                },
                ContentPart::Text {
                    text: "hi".to_string(),
                },
            ],
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAAA" } },
                    { "type": "text", "text": "hi" },
                ]
            })
        );

        let plain = WireMessage::text(WireRole::Assistant, "hello");
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            serde_json::json!({ "role": "assistant", "content": "hello" })
        );
    }

    #[test]
    fn test_wire_content_deserializes_both_shapes() {
        let plain: WireMessage =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(plain.content, WireContent::Text("hi".to_string()));

        let parts: WireMessage = serde_json::from_str(
            r#"{"role":"user","content":[{"type":"text","text":"hi"}]}"#,
        )
        .unwrap();
        assert!(matches!(parts.content, WireContent::Parts(_)));
    }
}
