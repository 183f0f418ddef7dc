//! HTTP transport to upstream dialect endpoints: a dialect-agnostic sender.
//! The bridge picks the URL, headers, and body; this module only moves
//! bytes and classifies failures.

use crate::ir::LLMErrorIR;
use reqwest::{Client, Method};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A unary upstream response: status plus parsed (or raw, on non-2xx) body.
#[derive(Debug)]
pub struct UnaryResponse {
    pub status: u16,
    pub body: JsonValue,
}

/// One upstream byte chunk, handed to the outbound adapter's `parse_stream`.
pub type WireChunk = Vec<u8>;

#[derive(Debug)]
pub enum TransportError {
    Network(String),
    Timeout,
    Cancelled,
}

impl From<TransportError> for LLMErrorIR {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Network(msg) => LLMErrorIR::network(msg),
            TransportError::Timeout => LLMErrorIR::timeout(),
            TransportError::Cancelled => LLMErrorIR::cancelled(),
        }
    }
}

/// A thin wrapper around a shared `reqwest::Client`, built once at startup
/// and cloned cheaply per request — `reqwest::Client` is already internally
/// `Arc`-backed connection pooling, so sharing one instance across every
/// dialect costs nothing.
#[derive(Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn new() -> Self {
        Self { client: Client::builder().build().expect("failed to build reqwest client") }
    }

    /// Sends a unary JSON request and returns the parsed body regardless of
    /// status (the caller classifies 4xx/5xx via the dialect's `parse_error`).
    pub async fn request(
        &self,
        url: &str,
        api_key: &str,
        body: &JsonValue,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<UnaryResponse, TransportError> {
        let send = self
            .client
            .request(Method::POST, url)
            .bearer_auth(api_key)
            .json(body)
            .send();

        let res = tokio::select! {
            res = tokio::time::timeout(timeout, send) => {
                res.map_err(|_| TransportError::Timeout)?
                    .map_err(|e| TransportError::Network(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
        };

        let status = res.status().as_u16();
        let bytes = tokio::select! {
            b = res.bytes() => b.map_err(|e| TransportError::Network(e.to_string()))?,
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
        };
        let body: JsonValue = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()));
        Ok(UnaryResponse { status, body })
    }

    /// Opens a streaming upstream request. Returns the response status (so
    /// the caller can branch to an error path before reading the body) plus a
    /// byte-chunk stream suitable for repeated `adapter.parse_stream` calls.
    pub async fn stream(
        &self,
        url: &str,
        api_key: &str,
        body: &JsonValue,
        cancel: CancellationToken,
    ) -> Result<(u16, impl futures::Stream<Item = Result<WireChunk, TransportError>>), TransportError>
    {
        use futures::StreamExt;

        let res = self
            .client
            .request(Method::POST, url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = res.status().as_u16();

        let byte_stream = res.bytes_stream().map(|r| r.map_err(|e| TransportError::Network(e.to_string())));
        let cancellable = futures::stream::unfold(
            (byte_stream, cancel),
            |(mut stream, cancel)| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                tokio::select! {
                    next = stream.next() => next.map(|item| (item.map(|b| b.to_vec()), (stream, cancel))),
                    _ = cancel.cancelled() => Some((Err(TransportError::Cancelled), (stream, cancel))),
                }
            },
        );
        Ok((status, cancellable))
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}
