//! The adapter contract: a per-dialect pair of `inbound` (parse dialect ->
//! IR) and `outbound` (build IR -> dialect) operations.
//!
//! The set of adapters is closed and known at build time; there is no
//! dynamic loading. [`AdapterRegistry`] is a read-mostly map populated once
//! at startup.

pub mod anthropic;
pub mod deepseek;
pub mod gemini;
pub mod moonshot;
pub mod openai;
pub mod qwen;
pub mod zhipu;

use crate::error::Result;
use crate::ir::{LLMErrorIR, LLMRequestIR, LLMResponseIR, LLMStreamEvent};
use crate::stream_builder::StreamEventBuilder;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Boolean feature flags a dialect adapter advertises.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub streaming: bool,
    pub tools: bool,
    pub vision: bool,
    pub multimodal: bool,
    pub system_prompt: bool,
    pub tool_choice: bool,
    pub reasoning: bool,
    pub web_search: bool,
    pub json_mode: bool,
    pub logprobs: bool,
    pub seed: bool,
}

/// A dialect's default HTTP surface.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: &'static str,
    pub chat_path: &'static str,
    pub models_path: &'static str,
}

/// A family of model names recognized by keyword substring match, used by
/// the model-mapping resolver's family tier.
#[derive(Debug, Clone)]
pub struct ModelFamily {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// One chunk of a dialect's native wire stream; `parse_stream` is invoked
/// once per such chunk.
pub type WireChunk<'a> = &'a [u8];

/// The inbound/outbound parse/build operations a dialect adapter implements,
/// plus its capability and endpoint metadata.
///
/// `parse_request`/`parse_response`/`parse_error` raise a `validation` error
/// on structural impossibility and substitute documented defaults for
/// optional data. `parse_stream` is stateless per invocation and may yield
/// zero, one, or multiple events from a single wire chunk.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn capabilities(&self) -> Capabilities;
    fn endpoint(&self) -> Endpoint;
    fn model_families(&self) -> &'static [ModelFamily] {
        &[]
    }
    /// The model name substituted when `IR.model` is absent at outbound build time.
    fn default_model(&self) -> &'static str;

    // --- inbound: dialect wire -> IR ---
    fn parse_request(&self, wire: &JsonValue) -> Result<LLMRequestIR>;
    fn parse_response(&self, wire: &JsonValue) -> Result<LLMResponseIR>;
    fn parse_stream(&self, chunk: WireChunk) -> Result<Vec<LLMStreamEvent>>;
    fn parse_error(&self, status: u16, wire: &JsonValue) -> LLMErrorIR;

    // --- outbound: IR -> dialect wire ---
    fn build_request(&self, ir: &LLMRequestIR) -> Result<JsonValue>;
    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue>;
    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder>;

    /// Renders an IR error in this dialect's native error envelope, for the
    /// bridge's partial-failure path. Defaults to the OpenAI-family shape;
    /// Anthropic and Gemini override with their own envelopes.
    fn build_error(&self, err: &LLMErrorIR) -> JsonValue {
        serde_json::json!({
            "error": {
                "message": err.message,
                "type": format!("{:?}", err.error_type).to_lowercase(),
                "code": err.code,
            }
        })
    }
}

/// Read-mostly map of dialect name -> adapter, built once at startup.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, std::sync::Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Registers every dialect adapter this gateway ships.
    pub fn with_builtin_adapters() -> Self {
        let mut adapters: HashMap<&'static str, std::sync::Arc<dyn Adapter>> = HashMap::new();
        adapters.insert("openai", std::sync::Arc::new(openai::OpenAIAdapter));
        adapters.insert("anthropic", std::sync::Arc::new(anthropic::AnthropicAdapter));
        adapters.insert("gemini", std::sync::Arc::new(gemini::GeminiAdapter));
        adapters.insert("deepseek", std::sync::Arc::new(deepseek::DeepSeekAdapter));
        adapters.insert("moonshot", std::sync::Arc::new(moonshot::MoonshotAdapter));
        adapters.insert("qwen", std::sync::Arc::new(qwen::QwenAdapter));
        adapters.insert("zhipu", std::sync::Arc::new(zhipu::ZhipuAdapter));
        Self { adapters }
    }

    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_builtin_adapters()
    }
}

/// Shared helper: promotes a leading `system`-role message in `messages` to
/// `IR.system`, removing it from the array. OpenAI-shaped dialects carry
/// system in the message array; this is the inverse of
/// `inline_system_message`.
pub(crate) fn promote_leading_system_message(
    mut messages: Vec<crate::ir::Message>,
) -> (Option<String>, Vec<crate::ir::Message>) {
    if let Some(first) = messages.first() {
        if first.role == crate::ir::Role::System {
            if let Some(text) = first.content.as_simple_text().map(|s| s.to_string()) {
                messages.remove(0);
                return (Some(text), messages);
            }
        }
    }
    (None, messages)
}

/// Inverse of [`promote_leading_system_message`]: re-inserts `system` as a
/// leading message for dialects that carry it inline.
pub(crate) fn inline_system_message(
    system: &Option<String>,
    messages: Vec<crate::ir::Message>,
) -> Vec<crate::ir::Message> {
    match system {
        Some(text) if !text.is_empty() => {
            let mut out = Vec::with_capacity(messages.len() + 1);
            out.push(crate::ir::Message::system(text.clone()));
            out.extend(messages);
            out
        }
        _ => messages,
    }
}

/// Simplifies a single-text-part content array to a plain string, an
/// inbound normalization rule applied uniformly across dialects.
pub(crate) fn simplify_message_content(mut m: crate::ir::Message) -> crate::ir::Message {
    if let Some(text) = m.content.as_simple_text() {
        m.content = crate::ir::MessageContent::Text(text.to_string());
    }
    m
}
