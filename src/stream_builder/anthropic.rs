//! Stream builder for Anthropic's event-typed SSE envelope.

use super::{SSEEvent, StreamEventBuilder, ToolCallTracker};
use crate::ir::{FinishReason, LLMStreamEvent};
use serde_json::json;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Block {
    Text,
    Thinking,
    ToolUse,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Idle,
    Streaming,
    Done,
}

/// The single block currently open on the wire. Anthropic blocks are
/// sequential, never interleaved: only one can be open at a time, so
/// switching kinds (or switching to a different tool call's index) must
/// stop this one first.
struct ActiveBlock {
    kind: Block,
    anthropic_index: u32,
    /// The IR tool-call `index` this block belongs to, when `kind` is `ToolUse`.
    tool_index: Option<u32>,
}

pub struct AnthropicStreamBuilder {
    state: State,
    id: String,
    model: String,
    next_block_index: u32,
    active_block: Option<ActiveBlock>,
    tool_tracker: ToolCallTracker,
}

impl AnthropicStreamBuilder {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            id: String::new(),
            model: String::new(),
            next_block_index: 0,
            active_block: None,
            tool_tracker: ToolCallTracker::default(),
        }
    }

    fn allocate_block(&mut self) -> u32 {
        let idx = self.next_block_index;
        self.next_block_index += 1;
        idx
    }

    /// Stops whichever block is currently open, if any, clearing it so a new
    /// block can be allocated.
    fn close_active(&mut self, frames: &mut Vec<SSEEvent>) {
        if let Some(active) = self.active_block.take() {
            frames.push(Self::stop_block_event(active.anthropic_index));
        }
    }

    fn start_block_event(&self, idx: u32, content_block: serde_json::Value) -> SSEEvent {
        SSEEvent::named(
            "content_block_start",
            json!({"type": "content_block_start", "index": idx, "content_block": content_block}),
        )
    }

    fn stop_block_event(idx: u32) -> SSEEvent {
        SSEEvent::named(
            "content_block_stop",
            json!({"type": "content_block_stop", "index": idx}),
        )
    }

    fn ensure_started(&mut self, frames: &mut Vec<SSEEvent>) {
        if self.state == State::Idle {
            self.state = State::Streaming;
            frames.push(SSEEvent::named(
                "message_start",
                json!({
                    "type": "message_start",
                    "message": {
                        "id": self.id,
                        "type": "message",
                        "role": "assistant",
                        "model": self.model,
                        "content": [],
                        "stop_reason": null,
                        "usage": {"input_tokens": 0, "output_tokens": 0},
                    }
                }),
            ));
        }
    }
}

impl Default for AnthropicStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamEventBuilder for AnthropicStreamBuilder {
    fn process(&mut self, event: LLMStreamEvent) -> Vec<SSEEvent> {
        let mut frames = Vec::new();
        match event {
            LLMStreamEvent::Start { id, model } => {
                self.id = id.unwrap_or_else(|| "msg_unknown".to_string());
                self.model = model.unwrap_or_default();
                self.ensure_started(&mut frames);
            }
            LLMStreamEvent::Reasoning { delta } => {
                self.ensure_started(&mut frames);
                let already_active =
                    matches!(self.active_block, Some(ref a) if a.kind == Block::Thinking);
                if !already_active {
                    self.close_active(&mut frames);
                    let idx = self.allocate_block();
                    self.active_block = Some(ActiveBlock { kind: Block::Thinking, anthropic_index: idx, tool_index: None });
                    frames.push(self.start_block_event(idx, json!({"type": "thinking", "thinking": ""})));
                }
                let idx = self.active_block.as_ref().unwrap().anthropic_index;
                frames.push(SSEEvent::named(
                    "content_block_delta",
                    json!({
                        "type": "content_block_delta",
                        "index": idx,
                        "delta": {"type": "thinking_delta", "thinking": delta},
                    }),
                ));
            }
            LLMStreamEvent::Content { delta, .. } => {
                self.ensure_started(&mut frames);
                let already_active =
                    matches!(self.active_block, Some(ref a) if a.kind == Block::Text);
                if !already_active {
                    self.close_active(&mut frames);
                    let idx = self.allocate_block();
                    self.active_block = Some(ActiveBlock { kind: Block::Text, anthropic_index: idx, tool_index: None });
                    frames.push(self.start_block_event(idx, json!({"type": "text", "text": ""})));
                }
                let idx = self.active_block.as_ref().unwrap().anthropic_index;
                frames.push(SSEEvent::named(
                    "content_block_delta",
                    json!({
                        "type": "content_block_delta",
                        "index": idx,
                        "delta": {"type": "text_delta", "text": delta},
                    }),
                ));
            }
            LLMStreamEvent::ToolCall { index, id, name, arguments } => {
                self.ensure_started(&mut frames);
                let (call, _is_first) =
                    self.tool_tracker.track(index, id.as_deref(), name.as_deref());
                let already_active = matches!(
                    self.active_block,
                    Some(ref a) if a.kind == Block::ToolUse && a.tool_index == Some(index)
                );
                if !already_active {
                    self.close_active(&mut frames);
                    let block_idx = self.allocate_block();
                    self.active_block =
                        Some(ActiveBlock { kind: Block::ToolUse, anthropic_index: block_idx, tool_index: Some(index) });
                    frames.push(self.start_block_event(
                        block_idx,
                        json!({"type": "tool_use", "id": call.id, "name": call.name, "input": {}}),
                    ));
                }
                let block_idx = self.active_block.as_ref().unwrap().anthropic_index;
                frames.push(SSEEvent::named(
                    "content_block_delta",
                    json!({
                        "type": "content_block_delta",
                        "index": block_idx,
                        "delta": {"type": "input_json_delta", "partial_json": arguments.unwrap_or_default()},
                    }),
                ));
            }
            LLMStreamEvent::End { finish_reason, usage } => {
                self.ensure_started(&mut frames);
                self.close_active(&mut frames);
                let stop_reason = match finish_reason {
                    FinishReason::Stop | FinishReason::EndTurn => "end_turn",
                    FinishReason::Length => "max_tokens",
                    FinishReason::ToolCalls => "tool_use",
                    FinishReason::ContentFilter => "stop_sequence",
                };
                let output_tokens = usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0);
                frames.push(SSEEvent::named(
                    "message_delta",
                    json!({
                        "type": "message_delta",
                        "delta": {"stop_reason": stop_reason, "stop_sequence": null},
                        "usage": {"output_tokens": output_tokens},
                    }),
                ));
                frames.push(SSEEvent::named("message_stop", json!({"type": "message_stop"})));
                self.state = State::Done;
            }
            LLMStreamEvent::Error { message, code } => {
                frames.push(SSEEvent::named(
                    "error",
                    json!({"type": "error", "error": {"type": code.unwrap_or_else(|| "api_error".to_string()), "message": message}}),
                ));
                self.state = State::Done;
            }
        }
        frames
    }

    fn finalize(&mut self) -> Vec<SSEEvent> {
        if self.state != State::Done {
            self.state = State::Done;
            let mut frames = Vec::new();
            self.close_active(&mut frames);
            frames.push(SSEEvent::named("message_stop", json!({"type": "message_stop"})));
            return frames;
        }
        Vec::new()
    }
}
