//! Content Formatter
//!
//! Turns raw model-output text into a sequence of structured display blocks
//! a surface can render without re-parsing. This is deliberately not a
//! Markdown engine: only the constructs the assistant is instructed to emit
//! are recognized (paragraphs, `- ` lists, `###` headings, fenced code,
//! `**strong**` spans, bare links).
//!
//! Fenced code spans are lifted out verbatim before any other processing so
//! that emphasis and link detection can never corrupt code content.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

static INLINE_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*.*?\*\*|\bhttps?://\S+\b").expect("valid regex"));

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###\s*").expect("valid regex"));

/// An inline run of text inside a paragraph, heading, or list item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InlineSpan {
    /// Plain text, passed through unchanged
    Text(String),
    /// Emphasized (strong) text, double-asterisk markers stripped
    Strong(String),
    /// A bare `http(s)://` link, opened in a new context by renderers
    Link(String),
}

/// One structured display block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayBlock {
    /// A plain paragraph
    Paragraph {
        /// Inline spans in source order
        spans: Vec<InlineSpan>,
    },
    /// A `###` heading
    Heading {
        /// Inline spans of the heading text, marker stripped
        spans: Vec<InlineSpan>,
    },
    /// An unordered list, one entry per `- ` line
    List {
        /// List items, each a run of inline spans with the marker stripped
        items: Vec<Vec<InlineSpan>>,
    },
    /// A fenced code block, content verbatim
    Code {
        /// Language label from the first fence line, if present
        language: Option<String>,
        /// Code body, never inline-formatted
        body: String,
    },
}

/// Format raw model output into display blocks
///
/// Single pass, block-then-inline. Idempotent on its own plain-paragraph
/// output: text without residual markers round-trips to one paragraph block.
pub fn format(text: &str) -> Vec<DisplayBlock> {
    // Lift fenced code out first, replacing each span with a unique
    // placeholder so the paragraph split and inline pass never see it.
    let mut placeholders: Vec<(String, String)> = Vec::new();
    let mut processed = text.to_string();
    for (i, m) in FENCED_CODE.find_iter(text).enumerate() {
        let marker = format!("__CODE_BLOCK_{i}__");
        processed = processed.replacen(m.as_str(), &marker, 1);
        placeholders.push((marker, m.as_str().to_string()));
    }

    processed
        .split("\n\n")
        .map(|paragraph| {
            // Restore lifted code verbatim before classifying.
            let mut paragraph = paragraph.to_string();
            for (marker, code) in &placeholders {
                if paragraph.contains(marker.as_str()) {
                    paragraph = paragraph.replacen(marker.as_str(), code, 1);
                }
            }
            classify(&paragraph)
        })
        .collect()
}

/// Classify one paragraph candidate, first match wins
fn classify(paragraph: &str) -> DisplayBlock {
    let trimmed = paragraph.trim();

    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        let inner = trimmed[3..trimmed.len() - 3].trim();
        let mut lines = inner.lines();
        let language = lines
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from);
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        return DisplayBlock::Code { language, body };
    }

    if trimmed.starts_with("- ") {
        let items = paragraph
            .split("\n- ")
            .map(|item| item.strip_prefix("- ").unwrap_or(item))
            .map(format_inline)
            .collect();
        return DisplayBlock::List { items };
    }

    if trimmed.starts_with("###") {
        let heading = HEADING_MARKER.replace(trimmed, "");
        return DisplayBlock::Heading {
            spans: format_inline(&heading),
        };
    }

    DisplayBlock::Paragraph {
        spans: format_inline(paragraph),
    }
}

/// Apply the inline pass: `**strong**` spans and bare links
fn format_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for m in INLINE_MARKUP.find_iter(text) {
        if m.start() > cursor {
            spans.push(InlineSpan::Text(text[cursor..m.start()].to_string()));
        }
        let part = m.as_str();
        if let Some(inner) = part
            .strip_prefix("**")
            .and_then(|p| p.strip_suffix("**"))
        {
            spans.push(InlineSpan::Strong(inner.to_string()));
        } else {
            spans.push(InlineSpan::Link(part.to_string()));
        }
        cursor = m.end();
    }

    if cursor < text.len() {
        spans.push(InlineSpan::Text(text[cursor..].to_string()));
    }
    spans
}
