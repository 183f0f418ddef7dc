//! Stream builder for the OpenAI-family SSE envelope, shared by OpenAI,
//! DeepSeek, Moonshot, Qwen, and Zhipu.

use super::{SSEEvent, StreamEventBuilder, ToolCallTracker};
use crate::ir::{FinishReason, LLMStreamEvent};
use serde_json::json;

#[derive(Debug, PartialEq, Eq)]
enum State {
    Idle,
    Streaming,
    Done,
}

/// `reasoning_content` is DeepSeek/Moonshot/Qwen's field name for the
/// reasoning channel; OpenAI itself has no reasoning surface, but emitting
/// the field costs nothing when a client ignores it, which lets this one
/// builder serve every OpenAI-compatible dialect.
pub struct OpenAIStreamBuilder {
    state: State,
    id: String,
    model: String,
    sent_role_opener: bool,
    tool_tracker: ToolCallTracker,
    created: i64,
}

impl OpenAIStreamBuilder {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            id: String::new(),
            model: String::new(),
            sent_role_opener: false,
            tool_tracker: ToolCallTracker::default(),
            created: 0,
        }
    }

    fn chunk_envelope(&self, delta: serde_json::Value, finish_reason: Option<&str>) -> SSEEvent {
        SSEEvent::json(json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{
                "index": 0,
                "delta": delta,
                "finish_reason": finish_reason,
            }],
        }))
    }

    fn ensure_started(&mut self) -> Vec<SSEEvent> {
        if self.state == State::Idle {
            self.state = State::Streaming;
            if self.id.is_empty() {
                self.id = "chatcmpl-unknown".to_string();
            }
            let opener = self.chunk_envelope(json!({"role": "assistant", "content": null}), None);
            self.sent_role_opener = true;
            return vec![opener];
        }
        Vec::new()
    }
}

impl Default for OpenAIStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEventBuilder for OpenAIStreamBuilder {
    fn process(&mut self, event: LLMStreamEvent) -> Vec<SSEEvent> {
        match event {
            LLMStreamEvent::Start { id, model } => {
                self.id = id.unwrap_or_else(|| "chatcmpl-unknown".to_string());
                self.model = model.unwrap_or_default();
                self.state = State::Streaming;
                let opener = self.chunk_envelope(json!({"role": "assistant", "content": null}), None);
                self.sent_role_opener = true;
                vec![opener]
            }
            LLMStreamEvent::Content { delta, .. } => {
                let mut frames = self.ensure_started();
                frames.push(self.chunk_envelope(json!({"content": delta}), None));
                frames
            }
            LLMStreamEvent::Reasoning { delta } => {
                let mut frames = self.ensure_started();
                frames.push(self.chunk_envelope(json!({"reasoning_content": delta}), None));
                frames
            }
            LLMStreamEvent::ToolCall { index, id, name, arguments } => {
                let mut frames = self.ensure_started();
                let (call, is_first) =
                    self.tool_tracker.track(index, id.as_deref(), name.as_deref());
                let tool_call_json = if is_first {
                    json!({
                        "index": index,
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": arguments.unwrap_or_default()},
                    })
                } else {
                    json!({
                        "index": index,
                        "function": {"arguments": arguments.unwrap_or_default()},
                    })
                };
                frames.push(self.chunk_envelope(json!({"tool_calls": [tool_call_json]}), None));
                frames
            }
            LLMStreamEvent::End { finish_reason, usage } => {
                let reason_str = match finish_reason {
                    FinishReason::Stop | FinishReason::EndTurn => "stop",
                    FinishReason::Length => "length",
                    FinishReason::ToolCalls => "tool_calls",
                    FinishReason::ContentFilter => "content_filter",
                };
                let mut envelope = self.chunk_envelope(json!({}), Some(reason_str));
                if let (SSEEvent { data: super::SSEData::Json(v), .. }, Some(u)) =
                    (&mut envelope, usage)
                {
                    v["usage"] = json!({
                        "prompt_tokens": u.prompt_tokens,
                        "completion_tokens": u.completion_tokens,
                        "total_tokens": u.total_tokens,
                    });
                }
                self.state = State::Done;
                vec![envelope, SSEEvent::done()]
            }
            LLMStreamEvent::Error { message, code } => {
                self.state = State::Done;
                vec![SSEEvent::json(json!({
                    "error": {"message": message, "code": code, "type": "server_error"},
                }))]
            }
        }
    }

    fn finalize(&mut self) -> Vec<SSEEvent> {
        if self.state != State::Done {
            self.state = State::Done;
            return vec![SSEEvent::done()];
        }
        Vec::new()
    }
}
