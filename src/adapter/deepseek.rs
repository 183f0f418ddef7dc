//! The DeepSeek dialect adapter. DeepSeek's wire format is byte-for-byte
//! OpenAI chat-completions with an added `reasoning_content` field on
//! assistant messages and stream deltas, which `openai.rs`'s shared wire
//! structs already carry.

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
    ModelFamily { name: "deepseek-chat", keywords: &["deepseek-chat"] },
    ModelFamily { name: "deepseek-reasoner", keywords: &["deepseek-reasoner", "deepseek-r1"] },
];

pub struct DeepSeekAdapter;

impl Adapter for DeepSeekAdapter {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            tools: true,
            vision: false,
            multimodal: false,
            system_prompt: true,
            tool_choice: true,
            reasoning: true,
            web_search: false,
            json_mode: true,
            logprobs: false,
            seed: true,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://api.deepseek.com",
            chat_path: "/v1/chat/completions",
            models_path: "/v1/models",
        }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "deepseek-chat"
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
