//! Thinking/Answer Splitter
//!
//! Detects and separates a model-authored "reasoning" section from the final
//! answer inside one response string. Two textual conventions are tolerated:
//!
//! 1. Bracketed tags: `<think>…</think>` (legacy producers; case-insensitive)
//! 2. Labeled sections: `**Analysis:**` followed by `**Answer:**` (canonical,
//!    what our own system instructions request)
//!
//! When both conventions appear in one response the bracketed tag wins; the
//! labeled convention is only consulted when no tag pair is present.
//!
//! Detection runs once, at message-creation time. The boolean result is
//! cached on the message and never recomputed.

use std::sync::LazyLock;

use regex::Regex;

static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>(.*?)</think>").expect("valid regex"));

static ANALYSIS_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*Analysis:\*\*\s*(.*?)\s*\*\*Answer:\*\*").expect("valid regex")
});

static ANSWER_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\*\*Answer:\*\*\s*(.*)").expect("valid regex"));

static THINK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<think>").expect("valid regex"));
static THINK_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</think>").expect("valid regex"));
static ANALYSIS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*\*Analysis:\*\*").expect("valid regex"));
static ANSWER_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\*\*Answer:\*\*").expect("valid regex"));

/// Result of splitting a response into reasoning and answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReasoningSplit {
    /// The "thinking aloud" section, if one was found (trimmed, non-empty)
    pub reasoning: Option<String>,
    /// The final answer; never empty, falls back to the full original text
    pub answer: String,
}

/// Whether `text` contains a reasoning section in either convention
pub fn has_reasoning_section(text: &str) -> bool {
    (THINK_OPEN.is_match(text) && THINK_CLOSE.is_match(text))
        || (ANALYSIS_LABEL.is_match(text) && ANSWER_LABEL.is_match(text))
}

/// Split `text` into reasoning and answer sections
///
/// Returns the whole text as the answer (reasoning `None`) when neither
/// convention matches, and never returns an empty answer.
pub fn split(text: &str) -> ReasoningSplit {
    // Bracketed tag convention first; it wins over labeled sections.
    if THINK_OPEN.is_match(text) && THINK_CLOSE.is_match(text) {
        let reasoning = THINK_SPAN
            .captures(text)
            .map(|cap| cap[1].trim().to_string())
            .filter(|r| !r.is_empty());
        let answer = THINK_SPAN.replace(text, "").trim().to_string();
        let answer = if answer.is_empty() {
            text.to_string()
        } else {
            answer
        };
        return ReasoningSplit { reasoning, answer };
    }

    if ANALYSIS_LABEL.is_match(text) && ANSWER_LABEL.is_match(text) {
        let reasoning = ANALYSIS_SECTION
            .captures(text)
            .map(|cap| cap[1].trim().to_string())
            .filter(|r| !r.is_empty());
        let answer = ANSWER_SECTION
            .captures(text)
            .map(|cap| cap[1].trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| text.to_string());
        return ReasoningSplit { reasoning, answer };
    }

    ReasoningSplit {
        reasoning: None,
        answer: text.to_string(),
    }
}
