//! The Gemini native dialect adapter.
//!
//! Accepts both Gemini's native `contents` shape and an OpenAI-shaped
//! `messages` payload, selecting by structural sniff.

use super::{Adapter, Capabilities, Endpoint};
use crate::error::Result;
use crate::ir::*;
use crate::stream_builder::{gemini::GeminiStreamBuilder, StreamEventBuilder};
use serde_json::{json, Value as JsonValue};

pub struct GeminiAdapter;

fn gemini_role_to_ir(role: &str) -> Role {
    match role {
        "model" => Role::Assistant,
        "function" => Role::Tool,
        _ => Role::User,
    }
}

fn parts_to_message(role: Role, parts: &[JsonValue]) -> Message {
    let mut content_parts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_result_text = None;
    for p in parts {
        if let Some(text) = p.get("text").and_then(|t| t.as_str()) {
            content_parts.push(ContentPart::Text { text: text.to_string() });
        } else if let Some(fc) = p.get("functionCall") {
            let name = fc.get("name").and_then(|n| n.as_str()).unwrap_or("").to_string();
            let args = fc.get("args").cloned().unwrap_or(json!({}));
            tool_calls.push(ToolCall {
                id: format!("call_{name}"),
                call_type: "function".to_string(),
                function: ToolCallFunction { name, arguments: args.to_string() },
            });
        } else if let Some(fr) = p.get("functionResponse") {
            tool_result_text = fr
                .get("response")
                .map(|r| r.to_string())
                .or(Some(String::new()));
        }
    }
    let content = if content_parts.len() == 1 {
        if let ContentPart::Text { text } = &content_parts[0] {
            MessageContent::Text(text.clone())
        } else {
            MessageContent::Parts(content_parts)
        }
    } else if content_parts.is_empty() {
        MessageContent::Text(tool_result_text.clone().unwrap_or_default())
    } else {
        MessageContent::Parts(content_parts)
    };
    Message {
        role,
        content,
        name: None,
        tool_call_id: None,
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        reasoning_content: None,
    }
}

fn message_to_gemini_content(m: &Message) -> JsonValue {
    let role = if m.role == Role::Assistant { "model" } else { "user" };
    let mut parts = Vec::new();
    match &m.content {
        MessageContent::Text(s) if !s.is_empty() => parts.push(json!({"text": s})),
        MessageContent::Parts(ps) => {
            for p in ps {
                match p {
                    ContentPart::Text { text } => parts.push(json!({"text": text})),
                    ContentPart::Image { source } => {
                        if let ImageSource::Base64 { media_type, data } = source {
                            parts.push(json!({"inlineData": {"mimeType": media_type, "data": data}}));
                        }
                    }
                    ContentPart::ToolResult { content, .. } => {
                        parts.push(json!({"functionResponse": {"response": {"content": content}}}));
                    }
                    ContentPart::ToolUse { name, input, .. } => {
                        parts.push(json!({"functionCall": {"name": name, "args": input}}));
                    }
                }
            }
        }
        _ => {}
    }
    if let Some(tool_calls) = &m.tool_calls {
        for tc in tool_calls {
            let args: JsonValue = serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
            parts.push(json!({"functionCall": {"name": tc.function.name, "args": args}}));
        }
    }
    json!({"role": role, "parts": parts})
}

impl Adapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            tools: true,
            vision: true,
            multimodal: true,
            system_prompt: true,
            tool_choice: false,
            reasoning: false,
            web_search: true,
            json_mode: true,
            logprobs: false,
            seed: true,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://generativelanguage.googleapis.com",
            chat_path: "/v1beta/models/{model}:streamGenerateContent",
            models_path: "/v1beta/models",
        }
    }

    fn default_model(&self) -> &'static str {
        "gemini-1.5-pro"
    }

    fn parse_request(&self, wire: &JsonValue) -> Result<LLMRequestIR> {
        if wire.get("messages").is_some() {
            return self.parse_openai_shaped_request(wire);
        }
        let contents = wire
            .get("contents")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMErrorIR::validation("missing required field `contents`"))?;
        let messages: Vec<Message> = contents
            .iter()
            .map(|c| {
                let role = gemini_role_to_ir(c.get("role").and_then(|r| r.as_str()).unwrap_or("user"));
                let parts = c.get("parts").and_then(|p| p.as_array()).cloned().unwrap_or_default();
                parts_to_message(role, &parts)
            })
            .collect();

        let system = wire
            .get("systemInstruction")
            .and_then(|si| si.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            });

        let tools = wire
            .get("tools")
            .and_then(|t| t.as_array())
            .and_then(|arr| arr.first())
            .and_then(|t| t.get("functionDeclarations"))
            .and_then(|fd| fd.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|f| {
                        Some(ToolDef {
                            name: f.get("name")?.as_str()?.to_string(),
                            description: f.get("description").and_then(|d| d.as_str()).unwrap_or("").to_string(),
                            parameters: f.get("parameters").cloned().unwrap_or(json!({"type": "object"})),
                        })
                    })
                    .collect()
            });

        let gen_config = wire.get("generationConfig");
        Ok(LLMRequestIR {
            messages,
            model: None,
            system,
            tools,
            tool_choice: None,
            stream: true,
            generation: GenerationParams {
                temperature: gen_config.and_then(|g| g.get("temperature")).and_then(|v| v.as_f64()).map(|v| v as f32),
                top_p: gen_config.and_then(|g| g.get("topP")).and_then(|v| v.as_f64()).map(|v| v as f32),
                top_k: gen_config.and_then(|g| g.get("topK")).and_then(|v| v.as_u64()).map(|v| v as u32),
                max_tokens: gen_config.and_then(|g| g.get("maxOutputTokens")).and_then(|v| v.as_u64()).map(|v| v as u32),
                stop_sequences: gen_config
                    .and_then(|g| g.get("stopSequences"))
                    .and_then(|v| v.as_array())
                    .map(|a| a.iter().filter_map(|x| x.as_str().map(String::from)).collect()),
                enable_search: wire.get("tools").and_then(|t| t.as_array()).map(|arr| {
                    arr.iter().any(|t| t.get("googleSearch").is_some() || t.get("googleSearchRetrieval").is_some())
                }),
                ..Default::default()
            },
            raw: wire.clone(),
        })
    }

    fn parse_response(&self, wire: &JsonValue) -> Result<LLMResponseIR> {
        let candidates = wire
            .get("candidates")
            .and_then(|c| c.as_array())
            .ok_or_else(|| LLMErrorIR::validation("missing required field `candidates`"))?;
        let mut choices = Vec::with_capacity(candidates.len());
        for (idx, c) in candidates.iter().enumerate() {
            let parts = c
                .get("content")
                .and_then(|ct| ct.get("parts"))
                .and_then(|p| p.as_array())
                .cloned()
                .unwrap_or_default();
            let message = parts_to_message(Role::Assistant, &parts);
            let reason_raw = c.get("finishReason").and_then(|v| v.as_str()).unwrap_or("STOP");
            choices.push(Choice { index: idx as u32, message, finish_reason: finish_reason_or_stop(reason_raw) });
        }
        let usage = wire.get("usageMetadata").map(|u| {
            let prompt = u.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let completion = u.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: u.get("totalTokenCount").and_then(|v| v.as_u64()).map(|v| v as u32).unwrap_or(prompt + completion),
                details: None,
            }
        });
        Ok(LLMResponseIR { id: String::new(), model: None, created: None, choices, usage, raw: wire.clone() })
    }

    fn parse_stream(&self, chunk: &[u8]) -> Result<Vec<LLMStreamEvent>> {
        let text = std::str::from_utf8(chunk).map_err(|e| LLMErrorIR::validation(e.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        // Gemini's streaming body is a JSON array of objects, possibly split
        // across reads; tolerate a leading `[`/`,`/trailing `]` fragment.
        let trimmed = text.trim_start_matches(['[', ',']).trim_end_matches(']').trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let v: JsonValue = serde_json::from_str(trimmed)?;
        let mut events = Vec::new();
        if let Some(candidates) = v.get("candidates").and_then(|c| c.as_array()) {
            for c in candidates {
                let parts = c
                    .get("content")
                    .and_then(|ct| ct.get("parts"))
                    .and_then(|p| p.as_array())
                    .cloned()
                    .unwrap_or_default();
                for p in &parts {
                    if let Some(text) = p.get("text").and_then(|t| t.as_str()) {
                        if p.get("thought").and_then(|t| t.as_bool()).unwrap_or(false) {
                            events.push(LLMStreamEvent::Reasoning { delta: text.to_string() });
                        } else if !text.is_empty() {
                            events.push(LLMStreamEvent::Content { delta: text.to_string(), index: 0 });
                        }
                    } else if let Some(fc) = p.get("functionCall") {
                        events.push(LLMStreamEvent::ToolCall {
                            index: 0,
                            id: None,
                            name: fc.get("name").and_then(|n| n.as_str()).map(String::from),
                            arguments: fc.get("args").map(|a| a.to_string()),
                        });
                    }
                }
                if let Some(reason) = c.get("finishReason").and_then(|r| r.as_str()) {
                    // Gemini often combines content and usage in the final chunk.
                    let usage = v.get("usageMetadata").map(|u| Usage {
                        prompt_tokens: u.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                        completion_tokens: u.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                        total_tokens: u.get("totalTokenCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
                        details: None,
                    });
                    events.push(LLMStreamEvent::End { finish_reason: finish_reason_or_stop(reason), usage });
                }
            }
        }
        Ok(events)
    }

    fn parse_error(&self, status: u16, wire: &JsonValue) -> LLMErrorIR {
        let err = wire.get("error").cloned().unwrap_or(json!({}));
        let message = err.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error").to_string();
        LLMErrorIR {
            error_type: ErrorType::from_http_status(status),
            message,
            code: err.get("status").and_then(|s| s.as_str()).map(String::from),
            status: Some(status),
            raw: wire.clone(),
        }
    }

    fn build_request(&self, ir: &LLMRequestIR) -> Result<JsonValue> {
        let contents: Vec<JsonValue> = ir.messages.iter().map(message_to_gemini_content).collect();
        let mut obj = json!({ "contents": contents });
        if let Some(system) = &ir.system {
            obj["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        let g = &ir.generation;
        let mut gen_config = serde_json::Map::new();
        if let Some(t) = g.temperature {
            gen_config.insert("temperature".into(), json!(t));
        }
        if let Some(t) = g.top_p {
            gen_config.insert("topP".into(), json!(t));
        }
        if let Some(t) = g.top_k {
            gen_config.insert("topK".into(), json!(t));
        }
        if let Some(t) = g.max_tokens {
            gen_config.insert("maxOutputTokens".into(), json!(t));
        }
        if let Some(s) = &g.stop_sequences {
            gen_config.insert("stopSequences".into(), json!(s));
        }
        if !gen_config.is_empty() {
            obj["generationConfig"] = JsonValue::Object(gen_config);
        }
        if let Some(tools) = &ir.tools {
            let decls: Vec<JsonValue> = tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description, "parameters": t.parameters}))
                .collect();
            obj["tools"] = json!([{"functionDeclarations": decls}]);
        }
        Ok(obj)
    }

    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue> {
        let candidates: Vec<JsonValue> = ir
            .choices
            .iter()
            .map(|c| {
                let content = message_to_gemini_content(&c.message);
                let reason = match c.finish_reason {
                    FinishReason::Length => "MAX_TOKENS",
                    FinishReason::ContentFilter => "SAFETY",
                    _ => "STOP",
                };
                json!({"content": content, "finishReason": reason, "index": c.index})
            })
            .collect();
        let mut obj = json!({ "candidates": candidates });
        if let Some(u) = &ir.usage {
            obj["usageMetadata"] = json!({
                "promptTokenCount": u.prompt_tokens,
                "candidatesTokenCount": u.completion_tokens,
                "totalTokenCount": u.total_tokens,
            });
        }
        Ok(obj)
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(GeminiStreamBuilder::new())
    }

    fn build_error(&self, err: &LLMErrorIR) -> JsonValue {
        json!({
            "error": {
                "code": err.status.unwrap_or(err.error_type.http_status()),
                "message": err.message,
                "status": format!("{:?}", err.error_type).to_uppercase(),
            }
        })
    }
}

impl GeminiAdapter {
    /// Accepts an OpenAI-shaped payload too: delegates field extraction to
    /// the same message/tool shapes OpenAI uses, since the wire is
    /// structurally OpenAI's even though this is the Gemini route.
    fn parse_openai_shaped_request(&self, wire: &JsonValue) -> Result<LLMRequestIR> {
        super::openai::OpenAIAdapter.parse_request(wire)
    }
}
