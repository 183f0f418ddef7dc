//! The HTTP ingress server: one route per inbound dialect's native chat
//! path, shared across every enabled proxy via a `:proxy_path` path
//! parameter rather than one statically registered route per route id.

use crate::bridge::{self, BridgeState};
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Builds the router for a shared [`BridgeState`]. `proxy_path` is read from
/// the URL, not from any statically registered per-route path, so adding or
/// removing a route only touches the config snapshot, never this router.
pub fn build_router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/:proxy_path/v1/chat/completions", post(openai_like_handler))
        .route("/:proxy_path/v1/messages", post(anthropic_handler))
        .route("/:proxy_path/v1beta/models/:model_action", post(gemini_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Drops its [`CancellationToken`] the moment it is itself dropped, which
/// happens when axum drops the streaming response body on client disconnect.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// The inbound dialect's wire framing, which decides the streaming
/// response's `Content-Type`: event-typed dialects stream proper
/// `text/event-stream` SSE, while Gemini native streams bare concatenated
/// JSON objects with no SSE framing at all.
#[derive(Clone, Copy)]
enum StreamFraming {
    Sse,
    ConcatenatedJson,
}

impl StreamFraming {
    fn content_type(self) -> &'static str {
        match self {
            StreamFraming::Sse => "text/event-stream",
            StreamFraming::ConcatenatedJson => "application/json",
        }
    }
}

async fn dispatch(state: Arc<BridgeState>, proxy_path: String, wire: JsonValue, framing: StreamFraming) -> Response {
    let wants_stream = wire.get("stream").and_then(|v| v.as_bool()).unwrap_or(false);
    if !wants_stream {
        let cancel = CancellationToken::new();
        let (status, body) = bridge::handle_unary(&state, &proxy_path, &wire, cancel).await;
        return (status_from_u16(status), Json(body)).into_response();
    }

    let cancel = CancellationToken::new();
    match bridge::handle_stream(Arc::clone(&state), proxy_path, wire, cancel.clone()).await {
        Ok(frames) => {
            // `frames` already yields fully wire-framed text in the inbound
            // dialect's own framing; forward it byte-for-byte instead of
            // re-framing through axum's `sse::Event`, which would double-wrap it.
            let guard = CancelOnDrop(cancel);
            let body_stream = async_stream::stream! {
                let _guard = guard;
                futures::pin_mut!(frames);
                while let Some(frame) = frames.next().await {
                    yield Ok::<_, Infallible>(Bytes::from(frame));
                }
            };
            let mut response = Response::new(Body::from_stream(body_stream));
            response
                .headers_mut()
                .insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_static(framing.content_type()));
            response
        }
        Err((status, body)) => (status_from_u16(status), Json(body)).into_response(),
    }
}

fn status_from_u16(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn openai_like_handler(State(state): State<Arc<BridgeState>>, Path(proxy_path): Path<String>, body: Bytes) -> Response {
    match serde_json::from_slice::<JsonValue>(&body) {
        Ok(wire) => dispatch(state, proxy_path, wire, StreamFraming::Sse).await,
        Err(e) => bad_request(e),
    }
}

async fn anthropic_handler(State(state): State<Arc<BridgeState>>, Path(proxy_path): Path<String>, body: Bytes) -> Response {
    match serde_json::from_slice::<JsonValue>(&body) {
        Ok(wire) => dispatch(state, proxy_path, wire, StreamFraming::Sse).await,
        Err(e) => bad_request(e),
    }
}

/// Gemini's path carries the model and the action (`generateContent` or
/// `streamGenerateContent`) as one segment, joined by `:`. Neither is
/// present in the JSON body, so both are folded into the wire payload
/// before handing it to the inbound adapter.
async fn gemini_handler(
    State(state): State<Arc<BridgeState>>,
    Path((proxy_path, model_action)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let (model, action) = match model_action.split_once(':') {
        Some((m, a)) => (m, a),
        None => (model_action.as_str(), "generateContent"),
    };
    let mut wire = match serde_json::from_slice::<JsonValue>(&body) {
        Ok(w) => w,
        Err(e) => return bad_request(e),
    };
    if let Some(obj) = wire.as_object_mut() {
        obj.entry("model").or_insert_with(|| JsonValue::String(model.to_string()));
        obj.insert("stream".to_string(), JsonValue::Bool(action == "streamGenerateContent"));
    }
    dispatch(state, proxy_path, wire, StreamFraming::ConcatenatedJson).await
}

fn bad_request(e: serde_json::Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": {"message": format!("invalid JSON body: {e}"), "type": "validation"}})),
    )
        .into_response()
}
