//! The Intermediate Representation (IR): a neutral data model for chat-completion
//! requests, responses, streaming events, and errors.
//!
//! The IR is purely data — no behavior lives here. It is the sole
//! interoperability contract between adapters.

pub mod error;
pub mod request;
pub mod response;
pub mod stream;

pub use error::{ErrorType, LLMErrorIR};
pub use request::{
    ContentPart, GenerationParams, ImageSource, LLMRequestIR, Message, MessageContent,
    ResponseFormat, Role, ThinkingConfig, ToolCall, ToolCallFunction, ToolChoice, ToolDef,
};
pub use response::{Choice, FinishReason, LLMResponseIR, Usage, UsageDetails};
pub use stream::LLMStreamEvent;
