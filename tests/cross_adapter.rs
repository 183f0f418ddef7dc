//! Translating a request parsed in one dialect into another dialect's wire
//! shape, the core operation the bridge performs between `parse_request` and
//! `build_request` on two different adapters.

use merco_gateway::adapter::anthropic::AnthropicAdapter;
use merco_gateway::adapter::gemini::GeminiAdapter;
use merco_gateway::adapter::openai::OpenAIAdapter;
use merco_gateway::adapter::Adapter;
use serde_json::json;

#[test]
fn openai_request_translates_to_anthropic_wire() {
    let inbound = OpenAIAdapter;
    let outbound = AnthropicAdapter;

    let openai_wire = json!({
        "model": "gpt-4o",
        "messages": [
            {"role": "system", "content": "be terse"},
            {"role": "user", "content": "hi"},
        ],
        "max_tokens": 256,
    });

    let ir = inbound.parse_request(&openai_wire).expect("valid request");
    let anthropic_wire = outbound.build_request(&ir).expect("builds");

    assert_eq!(anthropic_wire["system"], "be terse");
    assert_eq!(anthropic_wire["max_tokens"], 256);
    let messages = anthropic_wire["messages"].as_array().expect("messages array");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
}

#[test]
fn anthropic_response_translates_to_openai_wire() {
    let outbound = AnthropicAdapter;
    let inbound = OpenAIAdapter;

    let anthropic_wire = json!({
        "id": "msg_1",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": "hello there"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 8, "output_tokens": 4},
    });

    let ir = outbound.parse_response(&anthropic_wire).expect("valid response");
    let openai_wire = inbound.build_response(&ir).expect("builds");

    assert_eq!(openai_wire["object"], "chat.completion");
    assert_eq!(openai_wire["choices"][0]["message"]["content"], "hello there");
    assert_eq!(openai_wire["choices"][0]["finish_reason"], "stop");
    assert_eq!(openai_wire["usage"]["prompt_tokens"], 8);
}

#[test]
fn gemini_native_request_translates_to_openai_wire() {
    let inbound = GeminiAdapter;
    let outbound = OpenAIAdapter;

    let gemini_wire = json!({
        "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
        "generationConfig": {"maxOutputTokens": 128},
    });

    let ir = inbound.parse_request(&gemini_wire).expect("valid request");
    let openai_wire = outbound.build_request(&ir).expect("builds");

    let messages = openai_wire["messages"].as_array().expect("messages array");
    assert_eq!(messages.last().unwrap()["role"], "user");
    assert_eq!(openai_wire["max_tokens"], 128);
}
