//! A local gateway that translates chat-completion requests, responses, and
//! streams between LLM provider wire dialects (OpenAI, Anthropic, Gemini,
//! DeepSeek, Moonshot, Qwen, Zhipu), so a client speaking one dialect can
//! reach an upstream speaking another.
//!
//! Adapters are looked up through a closed [`adapter::AdapterRegistry`];
//! routing is described by a [`route::RouteTable`] that records which dialect
//! a client speaks, which upstream dialect to translate to, and how proxy
//! chains resolve.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ir;
pub mod logging;
pub mod mapping;
pub mod metrics;
pub mod route;
pub mod server;
pub mod stream_builder;
pub mod transport;

pub use adapter::{Adapter, AdapterRegistry};
pub use bridge::BridgeState;
pub use config::{ConfigError, ConfigSnapshot, ConfigSource, Settings};
pub use error::{GatewayError, Result};
pub use ir::{LLMErrorIR, LLMRequestIR, LLMResponseIR, LLMStreamEvent};
pub use route::{ProxyRoute, RouteTable};
