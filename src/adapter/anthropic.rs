//! The Anthropic Messages dialect adapter.

use super::{Adapter, Capabilities, Endpoint, ModelFamily};
use crate::error::Result;
use crate::ir::*;
use crate::stream_builder::{anthropic::AnthropicStreamBuilder, StreamEventBuilder};
use serde_json::{json, Value as JsonValue};

const FAMILIES: &[ModelFamily] = &[
    ModelFamily { name: "opus", keywords: &["opus"] },
    ModelFamily { name: "sonnet", keywords: &["sonnet"] },
    ModelFamily { name: "haiku", keywords: &["haiku"] },
];

pub struct AnthropicAdapter;

fn ir_content_to_wire(m: &Message) -> JsonValue {
    match &m.content {
        MessageContent::Text(s) if m.tool_calls.is_none() && m.tool_call_id.is_none() => json!(s),
        _ => {
            let mut blocks: Vec<JsonValue> = Vec::new();
            match &m.content {
                MessageContent::Text(s) => {
                    if !s.is_empty() {
                        blocks.push(json!({"type": "text", "text": s}));
                    }
                }
                MessageContent::Parts(parts) => {
                    for p in parts {
                        blocks.push(match p {
                            ContentPart::Text { text } => json!({"type": "text", "text": text}),
                            ContentPart::Image { source } => json!({
                                "type": "image",
                                "source": match source {
                                    ImageSource::Url { url } => json!({"type": "url", "url": url}),
                                    ImageSource::Base64 { media_type, data } =>
                                        json!({"type": "base64", "media_type": media_type, "data": data}),
                                },
                            }),
                            ContentPart::ToolUse { id, name, input } => {
                                json!({"type": "tool_use", "id": id, "name": name, "input": input})
                            }
                            ContentPart::ToolResult { tool_use_id, content, is_error } => json!({
                                "type": "tool_result",
                                "tool_use_id": tool_use_id,
                                "content": content,
                                "is_error": is_error,
                            }),
                        });
                    }
                }
            }
            if let Some(tool_call_id) = &m.tool_call_id {
                blocks.push(json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": m.content.to_plain_text(),
                }));
            }
            if let Some(tool_calls) = &m.tool_calls {
                for tc in tool_calls {
                    let input: JsonValue =
                        serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                    blocks.push(json!({
                        "type": "tool_use", "id": tc.id, "name": tc.function.name, "input": input,
                    }));
                }
            }
            json!(blocks)
        }
    }
}

fn wire_content_to_ir(role: Role, content: &JsonValue) -> Message {
    match content {
        JsonValue::String(s) => Message {
            role,
            content: MessageContent::Text(s.clone()),
            name: None,
            tool_call_id: None,
            tool_calls: None,
            reasoning_content: None,
        },
        JsonValue::Array(blocks) => {
            let mut parts = Vec::new();
            let mut tool_calls = Vec::new();
            let mut tool_call_id = None;
            let mut reasoning_content = None;
            for b in blocks {
                match b.get("type").and_then(|t| t.as_str()) {
                    Some("text") => {
                        if let Some(text) = b.get("text").and_then(|t| t.as_str()) {
                            parts.push(ContentPart::Text { text: text.to_string() });
                        }
                    }
                    Some("thinking") => {
                        reasoning_content =
                            b.get("thinking").and_then(|t| t.as_str()).map(String::from);
                    }
                    Some("image") => {
                        if let Some(src) = b.get("source") {
                            let source = match src.get("type").and_then(|t| t.as_str()) {
                                Some("url") => ImageSource::Url {
                                    url: src.get("url").and_then(|u| u.as_str()).unwrap_or("").to_string(),
                                },
                                _ => ImageSource::Base64 {
                                    media_type: src.get("media_type").and_then(|u| u.as_str()).unwrap_or("").to_string(),
                                    data: src.get("data").and_then(|u| u.as_str()).unwrap_or("").to_string(),
                                },
                            };
                            parts.push(ContentPart::Image { source });
                        }
                    }
                    Some("tool_use") => {
                        let id = b.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
                        let name = b.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
                        let input = b.get("input").cloned().unwrap_or(json!({}));
                        tool_calls.push(ToolCall {
                            id,
                            call_type: "function".to_string(),
                            function: ToolCallFunction { name, arguments: input.to_string() },
                        });
                    }
                    Some("tool_result") => {
                        tool_call_id = b.get("tool_use_id").and_then(|v| v.as_str()).map(String::from);
                        let text = match b.get("content") {
                            Some(JsonValue::String(s)) => s.clone(),
                            Some(other) => other.to_string(),
                            None => String::new(),
                        };
                        parts.push(ContentPart::Text { text });
                    }
                    _ => {}
                }
            }
            let content = if parts.len() == 1 {
                if let ContentPart::Text { text } = &parts[0] {
                    MessageContent::Text(text.clone())
                } else {
                    MessageContent::Parts(parts)
                }
            } else {
                MessageContent::Parts(parts)
            };
            Message {
                role,
                content,
                name: None,
                tool_call_id,
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                reasoning_content,
            }
        }
        _ => Message { role, content: MessageContent::Text(String::new()), name: None, tool_call_id: None, tool_calls: None, reasoning_content: None },
    }
}

impl Adapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            tools: true,
            vision: true,
            multimodal: true,
            system_prompt: true,
            tool_choice: true,
            reasoning: true,
            web_search: false,
            json_mode: false,
            logprobs: false,
            seed: false,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint { base_url: "https://api.anthropic.com", chat_path: "/v1/messages", models_path: "/v1/models" }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "claude-3-5-sonnet-20241022"
    }

    fn parse_request(&self, wire: &JsonValue) -> Result<LLMRequestIR> {
        let messages_wire = wire
            .get("messages")
            .and_then(|m| m.as_array())
            .ok_or_else(|| LLMErrorIR::validation("missing required field `messages`"))?;
        let messages: Vec<Message> = messages_wire
            .iter()
            .map(|m| {
                let role = match m.get("role").and_then(|r| r.as_str()) {
                    Some("assistant") => Role::Assistant,
                    _ => Role::User,
                };
                wire_content_to_ir(role, m.get("content").unwrap_or(&JsonValue::Null))
            })
            .collect();

        let system = match wire.get("system") {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Array(blocks)) => Some(
                blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        };

        let tools = wire.get("tools").and_then(|t| t.as_array()).map(|arr| {
            arr.iter()
                .filter_map(|t| {
                    Some(ToolDef {
                        name: t.get("name")?.as_str()?.to_string(),
                        description: t.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string(),
                        parameters: t.get("input_schema").cloned().unwrap_or(json!({"type": "object"})),
                    })
                })
                .collect()
        });
        let tool_choice = wire.get("tool_choice").and_then(|tc| match tc.get("type").and_then(|t| t.as_str()) {
            Some("auto") => Some(ToolChoice::Auto),
            Some("any") => Some(ToolChoice::Required),
            Some("tool") => tc.get("name").and_then(|n| n.as_str()).map(|n| ToolChoice::Function { name: n.to_string() }),
            _ => None,
        });

        let thinking = wire.get("thinking").map(|t| ThinkingConfig {
            enabled: t.get("type").and_then(|v| v.as_str()) == Some("enabled"),
            budget_tokens: t.get("budget_tokens").and_then(|v| v.as_u64()).map(|v| v as u32),
        });

        Ok(LLMRequestIR {
            messages,
            model: wire.get("model").and_then(|m| m.as_str()).map(String::from),
            system,
            tools,
            tool_choice,
            stream: wire.get("stream").and_then(|s| s.as_bool()).unwrap_or(false),
            generation: GenerationParams {
                temperature: wire.get("temperature").and_then(|v| v.as_f64()).map(|v| v as f32),
                top_p: wire.get("top_p").and_then(|v| v.as_f64()).map(|v| v as f32),
                top_k: wire.get("top_k").and_then(|v| v.as_u64()).map(|v| v as u32),
                max_tokens: wire.get("max_tokens").and_then(|v| v.as_u64()).map(|v| v as u32),
                stop_sequences: wire
                    .get("stop_sequences")
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|x| x.as_str().map(String::from)).collect()),
                thinking,
                ..Default::default()
            },
            raw: wire.clone(),
        })
    }

    fn parse_response(&self, wire: &JsonValue) -> Result<LLMResponseIR> {
        let id = wire.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let model = wire.get("model").and_then(|v| v.as_str()).map(String::from);
        let content = wire.get("content").cloned().unwrap_or(json!([]));
        let message = wire_content_to_ir(Role::Assistant, &content);
        let stop_reason = wire.get("stop_reason").and_then(|v| v.as_str()).unwrap_or("end_turn");
        let finish_reason = match stop_reason {
            "end_turn" | "stop_sequence" => FinishReason::EndTurn,
            "max_tokens" => FinishReason::Length,
            "tool_use" => FinishReason::ToolCalls,
            _ => FinishReason::Stop,
        };
        let usage = wire.get("usage").map(|u| {
            let prompt = u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let completion = u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
                details: u.get("cache_read_input_tokens").and_then(|v| v.as_u64()).map(|c| UsageDetails {
                    reasoning_tokens: None,
                    cached_tokens: Some(c as u32),
                }),
            }
        });
        Ok(LLMResponseIR {
            id,
            model,
            created: None,
            choices: vec![Choice { index: 0, message, finish_reason }],
            usage,
            raw: wire.clone(),
        })
    }

    fn parse_stream(&self, chunk: &[u8]) -> Result<Vec<LLMStreamEvent>> {
        let mut events = Vec::new();
        let mut event_name = String::new();
        for line in chunk.split(|&b| b == b'\n') {
            if let Some(rest) = line.strip_prefix(b"event: ") {
                event_name = String::from_utf8_lossy(rest).trim().to_string();
                continue;
            }
            let Some(data) = line.strip_prefix(b"data: ") else { continue };
            if data.is_empty() {
                continue;
            }
            let v: JsonValue = serde_json::from_slice(data)?;
            match event_name.as_str() {
                "message_start" => {
                    let msg = v.get("message").cloned().unwrap_or(json!({}));
                    events.push(LLMStreamEvent::Start {
                        id: msg.get("id").and_then(|i| i.as_str()).map(String::from),
                        model: msg.get("model").and_then(|m| m.as_str()).map(String::from),
                    });
                }
                "content_block_delta" => {
                    let delta = v.get("delta").cloned().unwrap_or(json!({}));
                    match delta.get("type").and_then(|t| t.as_str()) {
                        Some("text_delta") => {
                            if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                                events.push(LLMStreamEvent::Content { delta: text.to_string(), index: 0 });
                            }
                        }
                        Some("thinking_delta") => {
                            if let Some(text) = delta.get("thinking").and_then(|t| t.as_str()) {
                                events.push(LLMStreamEvent::Reasoning { delta: text.to_string() });
                            }
                        }
                        Some("input_json_delta") => {
                            let index = v.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as u32;
                            let partial = delta.get("partial_json").and_then(|p| p.as_str()).unwrap_or("");
                            events.push(LLMStreamEvent::ToolCall {
                                index,
                                id: None,
                                name: None,
                                arguments: Some(partial.to_string()),
                            });
                        }
                        _ => {}
                    }
                }
                "content_block_start" => {
                    let block = v.get("content_block").cloned().unwrap_or(json!({}));
                    if block.get("type").and_then(|t| t.as_str()) == Some("tool_use") {
                        let index = v.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as u32;
                        events.push(LLMStreamEvent::ToolCall {
                            index,
                            id: block.get("id").and_then(|i| i.as_str()).map(String::from),
                            name: block.get("name").and_then(|n| n.as_str()).map(String::from),
                            arguments: Some(String::new()),
                        });
                    }
                }
                "message_delta" => {
                    let delta = v.get("delta").cloned().unwrap_or(json!({}));
                    if let Some(stop_reason) = delta.get("stop_reason").and_then(|s| s.as_str()) {
                        let finish_reason = match stop_reason {
                            "max_tokens" => FinishReason::Length,
                            "tool_use" => FinishReason::ToolCalls,
                            _ => FinishReason::EndTurn,
                        };
                        let usage = v.get("usage").map(|u| Usage {
                            prompt_tokens: 0,
                            completion_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                            total_tokens: u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                            details: None,
                        });
                        events.push(LLMStreamEvent::End { finish_reason, usage });
                    }
                }
                "error" => {
                    let err = v.get("error").cloned().unwrap_or(json!({}));
                    events.push(LLMStreamEvent::Error {
                        message: err.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error").to_string(),
                        code: err.get("type").and_then(|t| t.as_str()).map(String::from),
                    });
                }
                _ => {}
            }
        }
        Ok(events)
    }

    fn parse_error(&self, status: u16, wire: &JsonValue) -> LLMErrorIR {
        let err = wire.get("error").cloned().unwrap_or(json!({}));
        let message = err.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error").to_string();
        let kind = err.get("type").and_then(|t| t.as_str()).unwrap_or("");
        let error_type = match kind {
            "invalid_request_error" => ErrorType::Validation,
            "authentication_error" => ErrorType::Authentication,
            "permission_error" => ErrorType::Permission,
            "not_found_error" => ErrorType::NotFound,
            "rate_limit_error" => ErrorType::RateLimit,
            "overloaded_error" | "api_error" => ErrorType::Server,
            _ => ErrorType::from_http_status(status),
        };
        LLMErrorIR { error_type, message, code: Some(kind.to_string()), status: Some(status), raw: wire.clone() }
    }

    fn build_request(&self, ir: &LLMRequestIR) -> Result<JsonValue> {
        let messages: Vec<JsonValue> = ir
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": if m.role == Role::Assistant { "assistant" } else { "user" },
                    "content": ir_content_to_wire(m),
                })
            })
            .collect();
        let mut obj = json!({
            "model": ir.model.clone().unwrap_or_else(|| self.default_model().to_string()),
            "messages": messages,
            "max_tokens": ir.generation.max_tokens.unwrap_or(4096),
            "stream": ir.stream,
        });
        if let Some(system) = &ir.system {
            obj["system"] = json!(system);
        }
        let g = &ir.generation;
        if let Some(t) = g.temperature {
            obj["temperature"] = json!(t);
        }
        if let Some(t) = g.top_p {
            obj["top_p"] = json!(t);
        }
        if let Some(t) = g.top_k {
            obj["top_k"] = json!(t);
        }
        if let Some(s) = &g.stop_sequences {
            obj["stop_sequences"] = json!(s);
        }
        if let Some(thinking) = &g.thinking {
            obj["thinking"] = if thinking.enabled {
                json!({"type": "enabled", "budget_tokens": thinking.budget_tokens.unwrap_or(1024)})
            } else {
                json!({"type": "disabled"})
            };
        }
        if let Some(tools) = &ir.tools {
            obj["tools"] = json!(tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "input_schema": t.parameters}))
                .collect::<Vec<_>>());
            // Anthropic has no `required` analogue; degrade to `auto`.
            if let Some(tc) = &ir.tool_choice {
                obj["tool_choice"] = match tc {
                    ToolChoice::Auto | ToolChoice::Required => json!({"type": "auto"}),
                    ToolChoice::None => json!({"type": "none"}),
                    ToolChoice::Function { name } => json!({"type": "tool", "name": name}),
                };
            }
        }
        Ok(obj)
    }

    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue> {
        let choice = ir.choices.first();
        let content = choice.map(|c| ir_content_to_wire(&c.message)).unwrap_or(json!([]));
        let content = match content {
            JsonValue::String(s) => json!([{"type": "text", "text": s}]),
            other => other,
        };
        let stop_reason = choice
            .map(|c| match c.finish_reason {
                FinishReason::Length => "max_tokens",
                FinishReason::ToolCalls => "tool_use",
                _ => "end_turn",
            })
            .unwrap_or("end_turn");
        let mut obj = json!({
            "id": ir.id,
            "type": "message",
            "role": "assistant",
            "model": ir.model.clone().unwrap_or_default(),
            "content": content,
            "stop_reason": stop_reason,
            "stop_sequence": null,
        });
        if let Some(u) = &ir.usage {
            obj["usage"] = json!({"input_tokens": u.prompt_tokens, "output_tokens": u.completion_tokens});
        }
        Ok(obj)
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(AnthropicStreamBuilder::new())
    }

    fn build_error(&self, err: &LLMErrorIR) -> JsonValue {
        let kind = match err.error_type {
            ErrorType::Validation => "invalid_request_error",
            ErrorType::Authentication => "authentication_error",
            ErrorType::Permission => "permission_error",
            ErrorType::NotFound => "not_found_error",
            ErrorType::RateLimit => "rate_limit_error",
            _ => "api_error",
        };
        json!({"type": "error", "error": {"type": kind, "message": err.message}})
    }
}
