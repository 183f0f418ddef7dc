//! The stream event builder: a stateful reconstructor that turns a sequence
//! of IR stream events into a dialect's native streamed envelope, one wire
//! chunk at a time.
//!
//! Each builder instance is allocated per request and never shared across
//! requests — there is no global mutable state here.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::ir::LLMStreamEvent;
use serde_json::Value as JsonValue;

/// A neutral representation of one SSE/chunked-JSON frame; the HTTP layer
/// serializes this to the dialect's wire framing.
#[derive(Debug, Clone)]
pub struct SSEEvent {
    pub event: Option<String>,
    pub data: SSEData,
}

#[derive(Debug, Clone)]
pub enum SSEData {
    Json(JsonValue),
    /// The `[DONE]` sentinel and other literal payloads.
    Raw(String),
    /// A complete JSON object emitted with no `data:`/`event:` framing, for
    /// dialects (Gemini native) that stream bare concatenated JSON rather
    /// than SSE.
    BareJson(JsonValue),
}

impl SSEEvent {
    pub fn json(data: JsonValue) -> Self {
        Self { event: None, data: SSEData::Json(data) }
    }

    pub fn named(event: &str, data: JsonValue) -> Self {
        Self { event: Some(event.to_string()), data: SSEData::Json(data) }
    }

    pub fn done() -> Self {
        Self { event: None, data: SSEData::Raw("[DONE]".to_string()) }
    }

    /// A bare JSON object with no SSE framing at all, for dialects that
    /// stream concatenated JSON objects instead of `data:`-prefixed events.
    pub fn bare_json(data: JsonValue) -> Self {
        Self { event: None, data: SSEData::BareJson(data) }
    }

    /// Renders this event in `data: <payload>\n\n` (or `event: ...\ndata:
    /// ...\n\n`) framing, except for `BareJson`, which renders as the raw
    /// JSON object followed by a newline and no `data:`/`event:` prefix.
    pub fn to_wire(&self) -> String {
        if let SSEData::BareJson(v) = &self.data {
            return format!("{v}\n");
        }
        let data_str = match &self.data {
            SSEData::Json(v) => v.to_string(),
            SSEData::Raw(s) => s.clone(),
            SSEData::BareJson(_) => unreachable!(),
        };
        match &self.event {
            Some(name) => format!("event: {name}\ndata: {data_str}\n\n"),
            None => format!("data: {data_str}\n\n"),
        }
    }
}

/// Per-response state machine: `Idle -> Streaming -> Done`.
///
/// `process` is called once per IR event and returns the wire frames that
/// event produces; `finalize` is called exactly once after the upstream
/// stream closes, cleanly or by cancellation.
pub trait StreamEventBuilder: Send {
    fn process(&mut self, event: LLMStreamEvent) -> Vec<SSEEvent>;
    fn finalize(&mut self) -> Vec<SSEEvent>;
}

/// Shared tool-call id/name bookkeeping: the first fragment for a given
/// `index` carries `id`+`name`; later fragments are argument-only deltas.
/// Ids are assigned from a per-builder monotonic counter, never from
/// wall-clock, so output stays deterministic.
#[derive(Debug, Default)]
pub(crate) struct ToolCallTracker {
    next_ordinal: u64,
    seen: std::collections::HashMap<u32, TrackedToolCall>,
}

#[derive(Debug, Clone)]
pub(crate) struct TrackedToolCall {
    pub id: String,
    pub name: String,
    pub started: bool,
}

impl ToolCallTracker {
    /// Returns `(call, is_first_fragment)`. A second, distinct tool call
    /// reusing an `index` that is already open is not currently detected: it
    /// is folded into the existing call as an argument-only delta.
    pub fn track(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
    ) -> (TrackedToolCall, bool) {
        if let Some(existing) = self.seen.get(&index) {
            return (existing.clone(), false);
        }
        self.next_ordinal += 1;
        let assigned_id = id
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("call_{}", self.next_ordinal));
        let assigned_name = name.unwrap_or_default().to_string();
        let call = TrackedToolCall { id: assigned_id, name: assigned_name, started: true };
        self.seen.insert(index, call.clone());
        (call, true)
    }

    pub fn open_indices(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.seen.keys().copied().collect();
        v.sort_unstable();
        v
    }
}
