//! The neutral error representation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Validation,
    Authentication,
    Permission,
    NotFound,
    RateLimit,
    Server,
    Network,
    Timeout,
    Cancelled,
    Unknown,
}

impl ErrorType {
    /// The HTTP status an error of this type is surfaced as.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorType::Validation => 400,
            ErrorType::Authentication => 401,
            ErrorType::Permission => 403,
            ErrorType::NotFound => 404,
            ErrorType::RateLimit => 429,
            ErrorType::Server => 500,
            ErrorType::Network => 502,
            ErrorType::Timeout => 504,
            ErrorType::Cancelled => 499,
            ErrorType::Unknown => 500,
        }
    }

    /// Classifies an upstream HTTP status into an IR error type, used as the
    /// fallback when a dialect's error body can't be parsed.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => ErrorType::Validation,
            401 => ErrorType::Authentication,
            403 => ErrorType::Permission,
            404 => ErrorType::NotFound,
            429 => ErrorType::RateLimit,
            500..=599 => ErrorType::Server,
            _ => ErrorType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMErrorIR {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub raw: JsonValue,
}

impl LLMErrorIR {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Validation,
            message: message.into(),
            code: None,
            status: None,
            raw: JsonValue::Null,
        }
    }

    pub fn circular_or_deep(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Validation,
            message: message.into(),
            code: Some("circular_or_deep".to_string()),
            status: None,
            raw: JsonValue::Null,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            error_type: ErrorType::Cancelled,
            message: "request cancelled".to_string(),
            code: None,
            status: None,
            raw: JsonValue::Null,
        }
    }

    pub fn timeout() -> Self {
        Self {
            error_type: ErrorType::Timeout,
            message: "request timed out".to_string(),
            code: None,
            status: None,
            raw: JsonValue::Null,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            error_type: ErrorType::Network,
            message: message.into(),
            code: None,
            status: None,
            raw: JsonValue::Null,
        }
    }
}
