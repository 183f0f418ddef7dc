//! The OpenAI chat-completions dialect adapter: a full bidirectional adapter
//! operating on IR rather than a thin one-way client.

use super::{inline_system_message, promote_leading_system_message, simplify_message_content};
use super::{Adapter, Capabilities, Endpoint, ModelFamily};
use crate::error::Result;
use crate::ir::*;
use crate::stream_builder::{openai::OpenAIStreamBuilder, StreamEventBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

const FAMILIES: &[ModelFamily] = &[
    ModelFamily { name: "gpt-4", keywords: &["gpt-4"] },
    ModelFamily { name: "gpt-3.5", keywords: &["gpt-3.5"] },
    ModelFamily { name: "o1", keywords: &["o1"] },
];

pub struct OpenAIAdapter;

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireToolCallFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct WireToolCallFunction {
    name: String,
    arguments: String,
}

pub(crate) fn role_to_wire(r: Role) -> &'static str {
    match r {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

pub(crate) fn role_from_wire(s: &str) -> Role {
    match s {
        "system" => Role::System,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::User,
    }
}

pub(crate) fn ir_message_to_wire(m: &Message) -> WireMessage {
    let content = match &m.content {
        MessageContent::Text(s) => Some(json!(s)),
        MessageContent::Parts(parts) => Some(json!(parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(json!({"type": "text", "text": text})),
                ContentPart::Image { source } => Some(json!({
                    "type": "image_url",
                    "image_url": {"url": match source {
                        ImageSource::Url { url } => url.clone(),
                        ImageSource::Base64 { media_type, data } =>
                            format!("data:{media_type};base64,{data}"),
                    }},
                })),
                _ => None,
            })
            .collect::<Vec<_>>())),
    };
    WireMessage {
        role: role_to_wire(m.role).to_string(),
        content,
        name: m.name.clone(),
        tool_call_id: m.tool_call_id.clone(),
        tool_calls: m.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    call_type: "function".to_string(),
                    function: WireToolCallFunction {
                        name: c.function.name.clone(),
                        arguments: c.function.arguments.clone(),
                    },
                })
                .collect()
        }),
        reasoning_content: m.reasoning_content.clone(),
    }
}

pub(crate) fn wire_message_to_ir(w: WireMessage) -> Message {
    let content = match w.content {
        Some(JsonValue::String(s)) => MessageContent::Text(s),
        Some(JsonValue::Array(arr)) => {
            let parts = arr
                .into_iter()
                .filter_map(|v| {
                    let t = v.get("type")?.as_str()?;
                    match t {
                        "text" => Some(ContentPart::Text { text: v.get("text")?.as_str()?.to_string() }),
                        "image_url" => {
                            let url = v.get("image_url")?.get("url")?.as_str()?.to_string();
                            Some(ContentPart::Image { source: ImageSource::Url { url } })
                        }
                        _ => None,
                    }
                })
                .collect();
            MessageContent::Parts(parts)
        }
        _ => MessageContent::Text(String::new()),
    };
    let m = Message {
        role: role_from_wire(&w.role),
        content,
        name: w.name,
        tool_call_id: w.tool_call_id,
        tool_calls: w.tool_calls.map(|tcs| {
            tcs.into_iter()
                .map(|tc| ToolCall {
                    id: tc.id,
                    call_type: tc.call_type,
                    function: ToolCallFunction { name: tc.function.name, arguments: tc.function.arguments },
                })
                .collect()
        }),
        reasoning_content: w.reasoning_content,
    };
    simplify_message_content(m)
}

pub(crate) fn tool_choice_to_wire(tc: &ToolChoice) -> JsonValue {
    match tc {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function { name } => json!({"type": "function", "function": {"name": name}}),
    }
}

pub(crate) fn tool_choice_from_wire(v: &JsonValue) -> Option<ToolChoice> {
    match v {
        JsonValue::String(s) if s == "auto" => Some(ToolChoice::Auto),
        JsonValue::String(s) if s == "none" => Some(ToolChoice::None),
        JsonValue::String(s) if s == "required" => Some(ToolChoice::Required),
        JsonValue::Object(_) => v
            .get("function")
            .and_then(|f| f.get("name"))
            .and_then(|n| n.as_str())
            .map(|name| ToolChoice::Function { name: name.to_string() }),
        _ => None,
    }
}

/// Shared parse/build logic for every OpenAI-shaped dialect (OpenAI itself,
/// DeepSeek, Moonshot, Qwen, Zhipu — all wire-compatible with OpenAI).
/// Kept here as free functions so the compatible dialects in
/// `deepseek.rs`/`moonshot.rs`/`qwen.rs`/`zhipu.rs` reuse exactly this wire
/// handling instead of re-deriving it.
pub(crate) fn parse_request_impl(wire: &JsonValue) -> Result<LLMRequestIR> {
    let messages_wire: Vec<WireMessage> = serde_json::from_value(
        wire.get("messages")
            .cloned()
            .ok_or_else(|| LLMErrorIR::validation("missing required field `messages`"))?,
    )?;
    let messages: Vec<Message> = messages_wire.into_iter().map(wire_message_to_ir).collect();
    let (system, messages) = promote_leading_system_message(messages);

    let tools = wire.get("tools").and_then(|t| t.as_array()).map(|arr| {
        arr.iter()
            .filter_map(|t| {
                let f = t.get("function")?;
                Some(ToolDef {
                    name: f.get("name")?.as_str()?.to_string(),
                    description: f.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string(),
                    parameters: f.get("parameters").cloned().unwrap_or(json!({"type": "object"})),
                })
            })
            .collect()
    });
    let tool_choice = wire.get("tool_choice").and_then(tool_choice_from_wire);

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
            max_tokens: wire
                .get("max_tokens")
                .or_else(|| wire.get("max_completion_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            stop_sequences: wire.get("stop").and_then(|v| match v {
                JsonValue::String(s) => Some(vec![s.clone()]),
                JsonValue::Array(a) => {
                    Some(a.iter().filter_map(|x| x.as_str().map(String::from)).collect())
                }
                _ => None,
            }),
            presence_penalty: wire.get("presence_penalty").and_then(|v| v.as_f64()).map(|v| v as f32),
            frequency_penalty: wire.get("frequency_penalty").and_then(|v| v.as_f64()).map(|v| v as f32),
            n: wire.get("n").and_then(|v| v.as_u64()).map(|v| v as u32),
            seed: wire.get("seed").and_then(|v| v.as_i64()),
            response_format: wire.get("response_format").and_then(|rf| {
                match rf.get("type").and_then(|t| t.as_str()) {
                    Some("json_object") => Some(ResponseFormat::JsonObject),
                    Some("json_schema") => {
                        rf.get("json_schema").cloned().map(|s| ResponseFormat::JsonSchema { json_schema: s })
                    }
                    _ => Some(ResponseFormat::Text),
                }
            }),
            thinking: None,
            enable_search: None,
            logprobs: wire.get("logprobs").and_then(|v| v.as_bool()),
            top_logprobs: wire.get("top_logprobs").and_then(|v| v.as_u64()).map(|v| v as u32),
        },
        raw: wire.clone(),
    })
}

pub(crate) fn parse_response_impl(wire: &JsonValue) -> Result<LLMResponseIR> {
    let id = wire.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let model = wire.get("model").and_then(|v| v.as_str()).map(String::from);
    let created = wire.get("created").and_then(|v| v.as_i64());
    let choices_wire = wire
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| LLMErrorIR::validation("missing required field `choices`"))?;
    let mut choices = Vec::with_capacity(choices_wire.len());
    for (idx, c) in choices_wire.iter().enumerate() {
        let message_wire: WireMessage = serde_json::from_value(
            c.get("message").cloned().ok_or_else(|| LLMErrorIR::validation("choice missing `message`"))?,
        )?;
        let finish_raw = c.get("finish_reason").and_then(|v| v.as_str()).unwrap_or("stop");
        choices.push(Choice {
            index: c.get("index").and_then(|v| v.as_u64()).unwrap_or(idx as u64) as u32,
            message: wire_message_to_ir(message_wire),
            finish_reason: finish_reason_or_stop(finish_raw),
        });
    }
    let usage = wire.get("usage").map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        details: u.get("completion_tokens_details").map(|d| UsageDetails {
            reasoning_tokens: d.get("reasoning_tokens").and_then(|v| v.as_u64()).map(|v| v as u32),
            cached_tokens: None,
        }),
    });
    Ok(LLMResponseIR { id, model, created, choices, usage, raw: wire.clone() })
}

pub(crate) fn parse_stream_impl(chunk: &[u8]) -> Result<Vec<LLMStreamEvent>> {
    let mut events = Vec::new();
    for line in chunk.split(|&b| b == b'\n') {
        if !line.starts_with(b"data: ") {
            continue;
        }
        let data = &line[6..];
        if data.is_empty() || data == b"[DONE]" {
            continue;
        }
        let v: JsonValue = serde_json::from_slice(data)?;
        let Some(choice) = v.get("choices").and_then(|c| c.as_array()).and_then(|a| a.first()) else {
            continue;
        };
        let delta = choice.get("delta");
        if let Some(content) = delta.and_then(|d| d.get("content")).and_then(|c| c.as_str()) {
            if !content.is_empty() {
                events.push(LLMStreamEvent::Content { delta: content.to_string(), index: 0 });
            }
        }
        if let Some(reasoning) = delta.and_then(|d| d.get("reasoning_content")).and_then(|c| c.as_str()) {
            if !reasoning.is_empty() {
                events.push(LLMStreamEvent::Reasoning { delta: reasoning.to_string() });
            }
        }
        if let Some(tool_calls) = delta.and_then(|d| d.get("tool_calls")).and_then(|t| t.as_array()) {
            for tc in tool_calls {
                events.push(LLMStreamEvent::ToolCall {
                    index: tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                    id: tc.get("id").and_then(|v| v.as_str()).map(String::from),
                    name: tc.get("function").and_then(|f| f.get("name")).and_then(|v| v.as_str()).map(String::from),
                    arguments: tc
                        .get("function")
                        .and_then(|f| f.get("arguments"))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                });
            }
        }
        if let Some(reason) = choice.get("finish_reason").and_then(|v| v.as_str()) {
            let usage = v.get("usage").map(|u| Usage {
                prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                completion_tokens: u.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                details: None,
            });
            events.push(LLMStreamEvent::End { finish_reason: finish_reason_or_stop(reason), usage });
        }
    }
    Ok(events)
}

pub(crate) fn parse_error_impl(status: u16, wire: &JsonValue) -> LLMErrorIR {
    let message = wire
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error")
        .to_string();
    let code = wire.get("error").and_then(|e| e.get("code")).and_then(|c| c.as_str()).map(String::from);
    LLMErrorIR {
        error_type: ErrorType::from_http_status(status),
        message,
        code,
        status: Some(status),
        raw: wire.clone(),
    }
}

pub(crate) fn build_request_impl(
    ir: &LLMRequestIR,
    default_model: &str,
    supports_required_tool_choice: bool,
) -> Result<JsonValue> {
    let messages = inline_system_message(&ir.system, ir.messages.clone());
    let wire_messages: Vec<WireMessage> = messages.iter().map(ir_message_to_wire).collect();
    let mut obj = json!({
        "model": ir.model.clone().unwrap_or_else(|| default_model.to_string()),
        "messages": wire_messages,
        "stream": ir.stream,
    });
    let g = &ir.generation;
    if let Some(t) = g.temperature {
        obj["temperature"] = json!(t);
    }
    if let Some(t) = g.top_p {
        obj["top_p"] = json!(t);
    }
    if let Some(t) = g.max_tokens {
        obj["max_tokens"] = json!(t);
    }
    if let Some(s) = &g.stop_sequences {
        obj["stop"] = json!(s);
    }
    if let Some(p) = g.presence_penalty {
        obj["presence_penalty"] = json!(p);
    }
    if let Some(p) = g.frequency_penalty {
        obj["frequency_penalty"] = json!(p);
    }
    if let Some(n) = g.n {
        obj["n"] = json!(n);
    }
    if let Some(s) = g.seed {
        obj["seed"] = json!(s);
    }
    if let Some(lp) = g.logprobs {
        obj["logprobs"] = json!(lp);
    }
    if let Some(tlp) = g.top_logprobs {
        obj["top_logprobs"] = json!(tlp);
    }
    if let Some(rf) = &g.response_format {
        obj["response_format"] = match rf {
            ResponseFormat::Text => json!({"type": "text"}),
            ResponseFormat::JsonObject => json!({"type": "json_object"}),
            ResponseFormat::JsonSchema { json_schema } => {
                json!({"type": "json_schema", "json_schema": json_schema})
            }
        };
    }
    if let Some(tools) = &ir.tools {
        obj["tools"] = json!(tools
            .iter()
            .map(|t| json!({
                "type": "function",
                "function": {"name": t.name, "description": t.description, "parameters": t.parameters},
            }))
            .collect::<Vec<_>>());
        if let Some(tc) = &ir.tool_choice {
            let tc = if matches!(tc, ToolChoice::Required) && !supports_required_tool_choice {
                ToolChoice::Auto
            } else {
                tc.clone()
            };
            obj["tool_choice"] = tool_choice_to_wire(&tc);
        }
    }
    Ok(obj)
}

pub(crate) fn build_response_impl(ir: &LLMResponseIR) -> Result<JsonValue> {
    let choices: Vec<JsonValue> = ir
        .choices
        .iter()
        .map(|c| {
            let wire_msg = ir_message_to_wire(&c.message);
            let finish_reason = match c.finish_reason {
                FinishReason::Stop | FinishReason::EndTurn => "stop",
                FinishReason::Length => "length",
                FinishReason::ToolCalls => "tool_calls",
                FinishReason::ContentFilter => "content_filter",
            };
            json!({"index": c.index, "message": wire_msg, "finish_reason": finish_reason})
        })
        .collect();
    let mut obj = json!({
        "id": ir.id,
        "object": "chat.completion",
        "created": ir.created.unwrap_or(0),
        "model": ir.model.clone().unwrap_or_default(),
        "choices": choices,
    });
    if let Some(u) = &ir.usage {
        obj["usage"] = json!({
            "prompt_tokens": u.prompt_tokens,
            "completion_tokens": u.completion_tokens,
            "total_tokens": u.total_tokens,
        });
    }
    Ok(obj)
}

impl Adapter for OpenAIAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            tools: true,
            vision: true,
            multimodal: true,
            system_prompt: true,
            tool_choice: true,
            reasoning: false,
            web_search: false,
            json_mode: true,
            logprobs: true,
            seed: true,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://api.openai.com",
            chat_path: "/v1/chat/completions",
            models_path: "/v1/models",
        }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "gpt-4o"
    }

    fn parse_request(&self, wire: &JsonValue) -> Result<LLMRequestIR> {
        parse_request_impl(wire)
    }

    fn parse_response(&self, wire: &JsonValue) -> Result<LLMResponseIR> {
        parse_response_impl(wire)
    }

    fn parse_stream(&self, chunk: &[u8]) -> Result<Vec<LLMStreamEvent>> {
        parse_stream_impl(chunk)
    }

    fn parse_error(&self, status: u16, wire: &JsonValue) -> LLMErrorIR {
        parse_error_impl(status, wire)
    }

    fn build_request(&self, ir: &LLMRequestIR) -> Result<JsonValue> {
        build_request_impl(ir, self.default_model(), true)
    }

    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue> {
        build_response_impl(ir)
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(OpenAIStreamBuilder::new())
    }
}
