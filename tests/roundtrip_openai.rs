//! OpenAI-dialect adapter round-trips: wire -> IR -> wire.

use merco_gateway::adapter::openai::OpenAIAdapter;
use merco_gateway::adapter::Adapter;
use merco_gateway::ir::Role;
use serde_json::json;

#[test]
fn parses_messages_and_promotes_leading_system() {
    let adapter = OpenAIAdapter;
    let wire = json!({
        "model": "gpt-4o",
        "messages": [
            {"role": "system", "content": "be terse"},
            {"role": "user", "content": "hi"},
        ],
        "temperature": 0.2,
    });
    let ir = adapter.parse_request(&wire).expect("valid request");
    assert_eq!(ir.model.as_deref(), Some("gpt-4o"));
    assert_eq!(ir.system.as_deref(), Some("be terse"));
    assert_eq!(ir.messages.len(), 1);
    assert_eq!(ir.messages[0].role, Role::User);
    assert_eq!(ir.generation.temperature, Some(0.2));
}

#[test]
fn build_request_reinlines_system_and_substitutes_default_model() {
    let adapter = OpenAIAdapter;
    let wire = json!({"messages": [{"role": "user", "content": "hi"}]});
    let mut ir = adapter.parse_request(&wire).expect("valid request");
    ir.system = Some("be terse".to_string());
    ir.model = None;

    let rebuilt = adapter.build_request(&ir).expect("builds");
    assert_eq!(rebuilt["model"], json!(adapter.default_model()));
    let messages = rebuilt["messages"].as_array().expect("messages array");
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "be terse");
}

#[test]
fn parse_response_extracts_usage_and_finish_reason() {
    let adapter = OpenAIAdapter;
    let wire = json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "hello there"},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13},
    });
    let ir = adapter.parse_response(&wire).expect("valid response");
    assert_eq!(ir.id, "chatcmpl-1");
    let usage = ir.usage.expect("usage present");
    assert_eq!(usage.prompt_tokens, 10);
    assert_eq!(usage.completion_tokens, 3);
    assert_eq!(ir.choices[0].finish_reason, merco_gateway::ir::FinishReason::Stop);
}

#[test]
fn malformed_request_is_a_validation_error() {
    let adapter = OpenAIAdapter;
    let wire = json!({"messages": "not-an-array"});
    assert!(adapter.parse_request(&wire).is_err());
}

#[test]
fn parse_error_classifies_by_http_status() {
    let adapter = OpenAIAdapter;
    let wire = json!({"error": {"message": "bad key", "type": "invalid_request_error"}});
    let ir = adapter.parse_error(401, &wire);
    assert_eq!(ir.error_type, merco_gateway::ir::ErrorType::Authentication);
    assert_eq!(ir.message, "bad key");
}
