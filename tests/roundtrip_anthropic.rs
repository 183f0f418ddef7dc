//! Anthropic Messages-dialect adapter round-trips and error-envelope shape.

use merco_gateway::adapter::anthropic::AnthropicAdapter;
use merco_gateway::adapter::Adapter;
use merco_gateway::ir::{ErrorType, FinishReason, LLMErrorIR};
use serde_json::json;

#[test]
fn parses_top_level_system_and_thinking_config() {
    let adapter = AnthropicAdapter;
    let wire = json!({
        "model": "claude-3-5-sonnet-20241022",
        "system": "be terse",
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": 1024,
        "thinking": {"type": "enabled", "budget_tokens": 2048},
    });
    let ir = adapter.parse_request(&wire).expect("valid request");
    assert_eq!(ir.system.as_deref(), Some("be terse"));
    let thinking = ir.generation.thinking.expect("thinking present");
    assert!(thinking.enabled);
    assert_eq!(thinking.budget_tokens, Some(2048));
}

#[test]
fn build_request_degrades_required_tool_choice_to_auto() {
    use merco_gateway::ir::{GenerationParams, LLMRequestIR, Message, ToolChoice, ToolDef};
    let adapter = AnthropicAdapter;
    let ir = LLMRequestIR {
        messages: vec![Message::user("hi")],
        model: Some("claude-3-5-sonnet-20241022".to_string()),
        system: None,
        tools: Some(vec![ToolDef {
            name: "lookup".to_string(),
            description: "look something up".to_string(),
            parameters: json!({"type": "object"}),
        }]),
        tool_choice: Some(ToolChoice::Required),
        stream: false,
        generation: GenerationParams::default(),
        raw: json!(null),
    };
    let wire = adapter.build_request(&ir).expect("builds");
    assert_eq!(wire["tool_choice"], json!({"type": "auto"}));
}

#[test]
fn parse_response_converts_stop_reason_and_usage() {
    let adapter = AnthropicAdapter;
    let wire = json!({
        "id": "msg_1",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": "hello"}],
        "stop_reason": "max_tokens",
        "usage": {"input_tokens": 5, "output_tokens": 2},
    });
    let ir = adapter.parse_response(&wire).expect("valid response");
    assert_eq!(ir.choices[0].finish_reason, FinishReason::Length);
    let usage = ir.usage.expect("usage present");
    assert_eq!(usage.total_tokens, 7);
}

#[test]
fn build_error_uses_anthropic_native_envelope() {
    let adapter = AnthropicAdapter;
    let err = LLMErrorIR::validation("missing messages");
    let body = adapter.build_error(&err);
    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["message"], "missing messages");
}

#[test]
fn parse_error_maps_native_error_type_names() {
    let adapter = AnthropicAdapter;
    let wire = json!({"type": "error", "error": {"type": "rate_limit_error", "message": "slow down"}});
    let ir = adapter.parse_error(429, &wire);
    assert_eq!(ir.error_type, ErrorType::RateLimit);
}
