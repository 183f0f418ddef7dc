//! The Zhipu (GLM) dialect adapter: like OpenAI.

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
    ModelFamily { name: "glm-4", keywords: &["glm-4"] },
    ModelFamily { name: "glm-3", keywords: &["glm-3"] },
];

pub struct ZhipuAdapter;

impl Adapter for ZhipuAdapter {
    fn name(&self) -> &'static str {
        "zhipu"
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
            web_search: true,
            json_mode: true,
            logprobs: false,
            seed: false,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            base_url: "https://open.bigmodel.cn/api/paas",
            chat_path: "/v4/chat/completions",
            models_path: "/v4/models",
        }
    }

    fn model_families(&self) -> &'static [ModelFamily] {
        FAMILIES
    }

    fn default_model(&self) -> &'static str {
        "glm-4"
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
