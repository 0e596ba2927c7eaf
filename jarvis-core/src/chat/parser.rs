use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::chat::calls::FunctionCallDescriptor;
use crate::chat::markup::normalize_markup;

pub const OPEN_MARKER: &str = "[FUNCTION_CALL]";
pub const CLOSE_MARKER: &str = "[/FUNCTION_CALL]";

static CALL_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[FUNCTION_CALL\](.*?)\[/FUNCTION_CALL\]").expect("valid call block regex")
});

/// Stands in for a removed block until fences wrapping it are cleaned up.
const REMOVED_BLOCK: &str = "\u{0}";

/// A code fence whose only content was a call block.
static FENCED_REMOVED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z]*\s*\x00\s*```").expect("valid fence regex")
});

static EXTRA_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("valid blank line regex")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Model text with every call block removed.
    pub visible_text: String,
    /// Decoded call blocks in source order.
    pub calls: Vec<FunctionCallDescriptor>,
    /// Blocks that were removed but could not be decoded.
    pub dropped: usize,
}

impl ParsedResponse {
    pub fn has_calls(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Split raw model output into display text and call descriptors.
///
/// Never fails: undecodable blocks are logged, counted and stripped.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let normalized = normalize_markup(raw);

    let mut calls = Vec::new();
    let mut dropped = 0;
    for capture in CALL_BLOCK.captures_iter(&normalized) {
        let payload = strip_code_fence(capture.get(1).map_or("", |m| m.as_str()));
        match serde_json::from_str::<FunctionCallDescriptor>(payload) {
            Ok(descriptor) => {
                debug!(function = %descriptor.function, "Extracted function call");
                calls.push(descriptor);
            }
            Err(e) => {
                warn!(?e, payload, "Dropping undecodable function call block");
                dropped += 1;
            }
        }
    }

    let marked = CALL_BLOCK.replace_all(&normalized, REMOVED_BLOCK);
    let visible = FENCED_REMOVED_BLOCK
        .replace_all(&marked, "")
        .replace(REMOVED_BLOCK, "");

    // Unmatched markers are removed; the text around them stays.
    if visible.contains(OPEN_MARKER) || visible.contains(CLOSE_MARKER) {
        warn!("Removing unmatched function call markers");
    }
    let visible = visible.replace(OPEN_MARKER, "").replace(CLOSE_MARKER, "");
    let visible = EXTRA_BLANK_LINES.replace_all(&visible, "\n\n");

    ParsedResponse {
        visible_text: visible.trim().to_string(),
        calls,
        dropped,
    }
}

/// Unwrap a payload the model put inside a Markdown code fence.
fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string, e.g. "json".
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}
