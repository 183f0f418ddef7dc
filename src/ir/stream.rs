//! Tagged-union stream events.
//!
//! Ordering invariant: for a single response, events obey
//! `start (content | reasoning | tool_call)* (end | error)`.

use super::response::{FinishReason, Usage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LLMStreamEvent {
    Start {
        id: Option<String>,
        model: Option<String>,
    },
    Content {
        delta: String,
        index: u32,
    },
    Reasoning {
        delta: String,
    },
    ToolCall {
        index: u32,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
    End {
        finish_reason: FinishReason,
        usage: Option<Usage>,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

impl LLMStreamEvent {
    /// True for the two terminal variants; a well-formed per-response event
    /// sequence contains exactly one such event, as its last element.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LLMStreamEvent::End { .. } | LLMStreamEvent::Error { .. })
    }
}
