//! The Qwen (DashScope compatible-mode) dialect adapter: like OpenAI, plus
//! an `enable_thinking` generation flag.

use super::openai::{
    build_request_impl, build_response_impl, parse_error_impl, parse_request_impl,
    parse_response_impl, parse_stream_impl,
};
use super::{Adapter, Capabilities, Endpoint, ModelFamily};
use crate::error::Result;
use crate::ir::*;
use crate::stream_builder::{openai::OpenAIStreamBuilder, StreamEventBuilder};
use serde_json::Value as JsonValue;

const FAMILIES: &[ModelFamily] = &[
    ModelFamily { name: "qwen-max", keywords: &["qwen-max"] },
    ModelFamily { name: "qwen-plus", keywords: &["qwen-plus"] },
    ModelFamily { name: "qwen-turbo", keywords: &["qwen-turbo"] },
];

pub struct QwenAdapter;

impl Adapter for QwenAdapter {
    fn name(&self) -> &'static str {
        "qwen"
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
            web_search: true,
            json_mode: true,
            logprobs: false,
            seed: true,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode",
            chat_path: "/v1/chat/completions",
            models_path: "/v1/models",
        }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "qwen-plus"
    }

    fn parse_request(&self, wire: &JsonValue) -> Result<LLMRequestIR> {
        let mut ir = parse_request_impl(wire)?;
        if let Some(enable) = wire.get("enable_thinking").and_then(|v| v.as_bool()) {
            ir.generation.thinking = Some(ThinkingConfig {
                enabled: enable,
                budget_tokens: wire.get("thinking_budget").and_then(|v| v.as_u64()).map(|v| v as u32),
            });
        }
        if let Some(enable) = wire.get("enable_search").and_then(|v| v.as_bool()) {
            ir.generation.enable_search = Some(enable);
        }
        Ok(ir)
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
        let mut obj = build_request_impl(ir, self.default_model(), true)?;
        if let Some(thinking) = &ir.generation.thinking {
            obj["enable_thinking"] = serde_json::json!(thinking.enabled);
            if let Some(budget) = thinking.budget_tokens {
                obj["thinking_budget"] = serde_json::json!(budget);
            }
        }
        if let Some(enable_search) = ir.generation.enable_search {
            obj["enable_search"] = serde_json::json!(enable_search);
        }
        Ok(obj)
    }

    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue> {
        build_response_impl(ir)
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(OpenAIStreamBuilder::new())
    }
}
