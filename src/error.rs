//! Crate-wide error type covering the gateway's full failure surface.

use crate::ir::LLMErrorIR;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// A translation step rejected the request or a dialect error body, already
    /// classified into the IR taxonomy.
    #[error("{0:?}")]
    Ir(LLMErrorIR),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no route matches path {0:?}")]
    RouteNotFound(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,
}

impl GatewayError {
    /// Projects any gateway error onto the IR error taxonomy, for emission
    /// through a dialect's error adapter.
    pub fn to_ir(&self) -> LLMErrorIR {
        match self {
            GatewayError::Ir(ir) => ir.clone(),
            GatewayError::Transport(e) => LLMErrorIR::network(e.to_string()),
            GatewayError::Json(e) => LLMErrorIR::validation(format!("invalid JSON: {e}")),
            GatewayError::Config(msg) => LLMErrorIR::validation(msg.clone()),
            GatewayError::RouteNotFound(path) => {
                let mut ir = LLMErrorIR::validation(format!("no route for path {path}"));
                ir.error_type = crate::ir::ErrorType::NotFound;
                ir
            }
            GatewayError::Cancelled => LLMErrorIR::cancelled(),
            GatewayError::Timeout => LLMErrorIR::timeout(),
        }
    }
}

impl From<LLMErrorIR> for GatewayError {
    fn from(ir: LLMErrorIR) -> Self {
        GatewayError::Ir(ir)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
