//! Stream builder for Gemini native's concatenated-JSON-object envelope.
//! Gemini has no "opening" frame: the first `content` event is simply the
//! first emitted object.

use super::{SSEEvent, StreamEventBuilder, ToolCallTracker};
use crate::ir::{FinishReason, LLMStreamEvent};
use serde_json::json;

#[derive(Debug, PartialEq, Eq)]
enum State {
    Idle,
    Streaming,
    Done,
}

pub struct GeminiStreamBuilder {
    state: State,
    tool_tracker: ToolCallTracker,
}

impl GeminiStreamBuilder {
    pub fn new() -> Self {
        Self { state: State::Idle, tool_tracker: ToolCallTracker::default() }
    }
}

impl Default for GeminiStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn finish_reason_str(r: FinishReason) -> &'static str {
    match r {
        FinishReason::Stop | FinishReason::EndTurn => "STOP",
        FinishReason::Length => "MAX_TOKENS",
        FinishReason::ToolCalls => "STOP",
        FinishReason::ContentFilter => "SAFETY",
    }
}

impl StreamEventBuilder for GeminiStreamBuilder {
    fn process(&mut self, event: LLMStreamEvent) -> Vec<SSEEvent> {
        match event {
            LLMStreamEvent::Start { .. } => {
                self.state = State::Streaming;
                Vec::new()
            }
            LLMStreamEvent::Content { delta, .. } => {
                self.state = State::Streaming;
                vec![SSEEvent::bare_json(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": delta}]},
                        "index": 0,
                    }],
                }))]
            }
            LLMStreamEvent::Reasoning { delta } => {
                self.state = State::Streaming;
                vec![SSEEvent::bare_json(json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": [{"text": delta, "thought": true}]},
                        "index": 0,
                    }],
                }))]
            }
            LLMStreamEvent::ToolCall { index, id, name, arguments } => {
                self.state = State::Streaming;
                let (call, _) = self.tool_tracker.track(index, id.as_deref(), name.as_deref());
                let args_value: serde_json::Value = arguments
                    .as_deref()
                    .and_then(|s| serde_json::from_str(s).ok())
                    .unwrap_or_else(|| json!({}));
                vec![SSEEvent::bare_json(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{"functionCall": {"name": call.name, "args": args_value}}],
                        },
                        "index": 0,
                    }],
                }))]
            }
            LLMStreamEvent::End { finish_reason, usage } => {
                self.state = State::Done;
                let mut obj = json!({
                    "candidates": [{
                        "content": {"role": "model", "parts": []},
                        "finishReason": finish_reason_str(finish_reason),
                        "index": 0,
                    }],
                });
                if let Some(u) = usage {
                    obj["usageMetadata"] = json!({
                        "promptTokenCount": u.prompt_tokens,
                        "candidatesTokenCount": u.completion_tokens,
                        "totalTokenCount": u.total_tokens,
                    });
                }
                vec![SSEEvent::bare_json(obj)]
            }
            LLMStreamEvent::Error { message, code } => {
                self.state = State::Done;
                vec![SSEEvent::bare_json(json!({
                    "error": {"message": message, "code": code},
                }))]
            }
        }
    }

    fn finalize(&mut self) -> Vec<SSEEvent> {
        self.state = State::Done;
        Vec::new()
    }
}
