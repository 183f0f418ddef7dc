//! The Moonshot (Kimi) dialect adapter. Moonshot's API 400s on a `required`
//! tool_choice, so outbound requests degrade it to `auto`.

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
    ModelFamily { name: "moonshot-v1", keywords: &["moonshot-v1"] },
    ModelFamily { name: "kimi", keywords: &["kimi"] },
];

pub struct MoonshotAdapter;

impl Adapter for MoonshotAdapter {
    fn name(&self) -> &'static str {
        "moonshot"
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
            logprobs: false,
            seed: false,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://api.moonshot.cn",
            chat_path: "/v1/chat/completions",
            models_path: "/v1/models",
        }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "moonshot-v1-8k"
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
        // `false`: Moonshot rejects `tool_choice: required`, so a requested
        // Required degrades to Auto here.
        build_request_impl(ir, self.default_model(), false)
    }

    fn build_response(&self, ir: &LLMResponseIR) -> Result<JsonValue> {
        build_response_impl(ir)
    }

    fn create_stream_builder(&self) -> Box<dyn StreamEventBuilder> {
        Box::new(OpenAIStreamBuilder::new())
    }
}
