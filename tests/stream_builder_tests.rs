//! Stream-builder wire framing for each dialect.

use merco_gateway::ir::{FinishReason, LLMStreamEvent};
use merco_gateway::stream_builder::anthropic::AnthropicStreamBuilder;
use merco_gateway::stream_builder::gemini::GeminiStreamBuilder;
use merco_gateway::stream_builder::openai::OpenAIStreamBuilder;
use merco_gateway::stream_builder::StreamEventBuilder;

#[test]
fn openai_builder_opens_with_role_then_streams_content_then_done() {
    let mut builder = OpenAIStreamBuilder::new();
    let opener = builder.process(LLMStreamEvent::Start { id: Some("chatcmpl-1".to_string()), model: Some("gpt-4o".to_string()) });
    assert_eq!(opener.len(), 1);
    assert!(opener[0].to_wire().contains("\"role\":\"assistant\""));

    let content = builder.process(LLMStreamEvent::Content { delta: "hi".to_string(), index: 0 });
    assert!(content[0].to_wire().contains("\"content\":\"hi\""));

    let end = builder.process(LLMStreamEvent::End { finish_reason: FinishReason::Stop, usage: None });
    let wires: Vec<String> = end.iter().map(|e| e.to_wire()).collect();
    assert!(wires.iter().any(|w| w.contains("\"finish_reason\":\"stop\"")));
    assert!(wires.iter().any(|w| w.contains("[DONE]")));

    // finalize after a terminal event is a no-op.
    assert!(builder.finalize().is_empty());
}

#[test]
fn openai_builder_finalize_sends_done_on_early_cancellation() {
    let mut builder = OpenAIStreamBuilder::new();
    builder.process(LLMStreamEvent::Start { id: None, model: None });
    let frames = builder.finalize();
    assert_eq!(frames.len(), 1);
    assert!(frames[0].to_wire().contains("[DONE]"));
}

#[test]
fn anthropic_builder_emits_named_sse_events() {
    let mut builder = AnthropicStreamBuilder::new();
    let start = builder.process(LLMStreamEvent::Start { id: Some("msg_1".to_string()), model: Some("claude-3-5-sonnet-20241022".to_string()) });
    assert_eq!(start[0].to_wire(), format!("event: message_start\ndata: {}\n\n", message_start_json()));

    let content = builder.process(LLMStreamEvent::Content { delta: "hi".to_string(), index: 0 });
    // first content event opens a text block, then emits the delta.
    assert!(content[0].to_wire().starts_with("event: content_block_start\n"));
    assert!(content[1].to_wire().starts_with("event: content_block_delta\n"));

    let end = builder.process(LLMStreamEvent::End { finish_reason: FinishReason::EndTurn, usage: None });
    let wires: Vec<String> = end.iter().map(|e| e.to_wire()).collect();
    assert!(wires.iter().any(|w| w.starts_with("event: content_block_stop\n")));
    assert!(wires.iter().any(|w| w.starts_with("event: message_stop\n")));
}

fn message_start_json() -> String {
    serde_json::json!({
        "type": "message_start",
        "message": {
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [],
            "stop_reason": null,
            "usage": {"input_tokens": 0, "output_tokens": 0},
        }
    })
    .to_string()
}

#[test]
fn gemini_builder_has_no_opening_frame() {
    let mut builder = GeminiStreamBuilder::new();
    assert!(builder.process(LLMStreamEvent::Start { id: None, model: None }).is_empty());
    let content = builder.process(LLMStreamEvent::Content { delta: "hi".to_string(), index: 0 });
    assert_eq!(content.len(), 1);
    assert!(content[0].to_wire().contains("\"text\":\"hi\""));
}
