//! The bridge / proxy engine: routes a request, drives the translation
//! pipeline, and records the request log + metrics.

use crate::adapter::{Adapter, AdapterRegistry, ModelFamily};
use crate::config::Settings;
use crate::error::{GatewayError, Result};
use crate::ir::LLMRequestIR;
use crate::mapping::resolve_model;
use crate::metrics::{AppendOnlySink, RequestLogRecord, SharedMetrics};
use crate::route::{ProxyRoute, ResolveError, RouteTable};
use crate::stream_builder::StreamEventBuilder;
use crate::transport::{Transport, TransportError};
use arc_swap::ArcSwap;
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Everything a running request needs: adapter registry, the current route
/// table snapshot, shared transport, and the metrics/log sinks. Routes and
/// settings are read-mostly, atomically-replaced snapshots; this is the only
/// shared mutable state in the gateway.
pub struct BridgeState {
    pub adapters: AdapterRegistry,
    pub routes: ArcSwap<RouteTable>,
    pub settings: ArcSwap<Settings>,
    pub transport: Transport,
    pub metrics: SharedMetrics,
    pub sink: Arc<dyn AppendOnlySink>,
}

impl BridgeState {
    pub fn new(routes: RouteTable, settings: Settings, sink: Arc<dyn AppendOnlySink>) -> Self {
        Self {
            adapters: AdapterRegistry::with_builtin_adapters(),
            routes: ArcSwap::from_pointee(routes),
            settings: ArcSwap::from_pointee(settings),
            transport: Transport::new(),
            metrics: Arc::new(crate::metrics::MetricsAccumulator::default()),
            sink,
        }
    }
}

/// The outcome of resolving a route's outbound target through any proxy
/// chain.
struct ResolvedOutbound {
    target: crate::route::ProviderTarget,
    adapter_name: String,
}

fn resolve(state: &BridgeState, proxy_path: &str) -> Result<(ProxyRoute, ResolvedOutbound)> {
    let routes = state.routes.load();
    let route = routes
        .find_by_path(proxy_path)
        .ok_or_else(|| GatewayError::RouteNotFound(proxy_path.to_string()))?
        .clone();
    let max_depth = state.settings.load().max_proxy_depth;
    let (target, adapter_name) = routes
        .resolve_outbound(&route, max_depth)
        .map(|(t, a)| (t.clone(), a.to_string()))
        .map_err(|e: ResolveError| GatewayError::Ir(e.into()))?;
    Ok((route, ResolvedOutbound { target, adapter_name }))
}

/// Applies the model-mapping resolver to `ir.model` in place.
fn apply_model_mapping(ir: &mut LLMRequestIR, route: &ProxyRoute, outbound_families: &'static [ModelFamily]) {
    let Some(model) = ir.model.clone() else { return };
    let thinking_enabled = ir.generation.thinking.as_ref().map(|t| t.enabled).unwrap_or(false);
    let resolved = resolve_model(&model, &route.model_mappings, outbound_families, thinking_enabled);
    ir.model = Some(resolved);
}

/// The fallback adapter used to render an error when routing itself fails,
/// before any inbound dialect is known.
fn fallback_error_adapter() -> crate::adapter::openai::OpenAIAdapter {
    crate::adapter::openai::OpenAIAdapter
}

/// Runs the non-streaming pipeline. Returns the status code and response
/// body to send to the client, already in the client's (inbound) dialect.
pub async fn handle_unary(
    state: &BridgeState,
    proxy_path: &str,
    inbound_wire: &JsonValue,
    cancel: CancellationToken,
) -> (u16, JsonValue) {
    let started = Instant::now();
    match handle_unary_inner(state, proxy_path, inbound_wire, cancel).await {
        Ok((status, body, record)) => {
            record_and_log(state, record, started, status, None);
            (status, body)
        }
        Err((status, body, record)) => {
            record_and_log(state, record, started, status, Some("error"));
            (status, body)
        }
    }
}

type UnaryOutcome = (u16, JsonValue, PartialLogRecord);

async fn handle_unary_inner(
    state: &BridgeState,
    proxy_path: &str,
    inbound_wire: &JsonValue,
    cancel: CancellationToken,
) -> std::result::Result<UnaryOutcome, UnaryOutcome> {
    let (route, resolved) = match resolve(state, proxy_path) {
        Ok(r) => r,
        Err(e) => {
            let ir = e.to_ir();
            let body = fallback_error_adapter().build_error(&ir);
            return Err((ir.error_type.http_status(), body, PartialLogRecord::bare(proxy_path)));
        }
    };
    let span = tracing::info_span!("bridge.unary", route_id = %route.id, proxy_path = %route.proxy_path);
    async move {
        let inbound = state.adapters.get(&route.inbound_adapter).expect("unknown inbound adapter configured on route");
        let outbound = state.adapters.get(&resolved.adapter_name).expect("unknown outbound adapter configured on route");

        let mut ir = match inbound.parse_request(inbound_wire) {
            Ok(ir) => ir,
            Err(e) => {
                let ir_err = e.to_ir();
                return Err((ir_err.error_type.http_status(), inbound.build_error(&ir_err), PartialLogRecord::for_route(&route)));
            }
        };
        let source_model = ir.model.clone();
        apply_model_mapping(&mut ir, &route, outbound.model_families());
        let target_model = ir.model.clone();

        let wire_request = match outbound.build_request(&ir) {
            Ok(w) => w,
            Err(e) => {
                let ir_err = e.to_ir();
                return Err((
                    ir_err.error_type.http_status(),
                    inbound.build_error(&ir_err),
                    PartialLogRecord::for_route(&route).with_models(source_model, target_model),
                ));
            }
        };

        let url = format!("{}{}", resolved.target.base_url, resolved.target.chat_path);
        let timeout = Duration::from_secs(state.settings.load().request_timeout_secs);
        let res = match state.transport.request(&url, &resolved.target.api_key, &wire_request, timeout, &cancel).await {
            Ok(r) => r,
            Err(e) => {
                let ir_err: crate::ir::LLMErrorIR = e.into();
                return Err((
                    ir_err.error_type.http_status(),
                    inbound.build_error(&ir_err),
                    PartialLogRecord::for_route(&route).with_models(source_model, target_model),
                ));
            }
        };

        if res.status >= 400 {
            let ir_err = outbound.parse_error(res.status, &res.body);
            return Err((
                ir_err.error_type.http_status(),
                inbound.build_error(&ir_err),
                PartialLogRecord::for_route(&route).with_models(source_model, target_model),
            ));
        }

        let response_ir = match outbound.parse_response(&res.body) {
            Ok(r) => r,
            Err(e) => {
                let ir_err = e.to_ir();
                return Err((
                    ir_err.error_type.http_status(),
                    inbound.build_error(&ir_err),
                    PartialLogRecord::for_route(&route).with_models(source_model, target_model),
                ));
            }
        };
        let tokens = response_ir.usage.as_ref().map(|u| (u.prompt_tokens, u.completion_tokens));
        let client_wire = match inbound.build_response(&response_ir) {
            Ok(w) => w,
            Err(e) => {
                let ir_err = e.to_ir();
                return Err((
                    ir_err.error_type.http_status(),
                    inbound.build_error(&ir_err),
                    PartialLogRecord::for_route(&route).with_models(source_model, target_model),
                ));
            }
        };

        let mut record = PartialLogRecord::for_route(&route).with_models(source_model, target_model);
        if let Some((p, c)) = tokens {
            record.input_tokens = Some(p);
            record.output_tokens = Some(c);
        }
        Ok((200, client_wire, record))
    }
    .instrument(span)
    .await
}

/// Runs the streaming pipeline. The returned stream yields already
/// wire-framed SSE text chunks in the client's dialect; the HTTP layer only
/// needs to forward bytes.
pub async fn handle_stream(
    state: Arc<BridgeState>,
    proxy_path: String,
    inbound_wire: JsonValue,
    cancel: CancellationToken,
) -> std::result::Result<impl futures::Stream<Item = String>, (u16, JsonValue)> {
    let (route, resolved) = resolve(&state, &proxy_path).map_err(|e| {
        let ir = e.to_ir();
        (ir.error_type.http_status(), fallback_error_adapter().build_error(&ir))
    })?;

    let inbound = state.adapters.get(&route.inbound_adapter).expect("unknown inbound adapter configured on route");
    let outbound = state.adapters.get(&resolved.adapter_name).expect("unknown outbound adapter configured on route");

    let mut ir = inbound.parse_request(&inbound_wire).map_err(|e| {
        let ir_err = e.to_ir();
        (ir_err.error_type.http_status(), inbound.build_error(&ir_err))
    })?;
    ir.stream = true;
    let source_model = ir.model.clone();
    apply_model_mapping(&mut ir, &route, outbound.model_families());
    let target_model = ir.model.clone();

    let wire_request = outbound.build_request(&ir).map_err(|e| {
        let ir_err = e.to_ir();
        (ir_err.error_type.http_status(), inbound.build_error(&ir_err))
    })?;

    let url = format!("{}{}", resolved.target.base_url, resolved.target.chat_path);
    let (status, mut upstream) = state
        .transport
        .stream(&url, &resolved.target.api_key, &wire_request, cancel.clone())
        .await
        .map_err(|e| {
            let ir_err: crate::ir::LLMErrorIR = e.into();
            (ir_err.error_type.http_status(), inbound.build_error(&ir_err))
        })?;

    if status >= 400 {
        // A failed stream open arrives as a single ordinary body, not SSE frames.
        let mut buf = Vec::new();
        while let Some(Ok(chunk)) = upstream.next().await {
            buf.extend_from_slice(&chunk);
        }
        let body: JsonValue =
            serde_json::from_slice(&buf).unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(&buf).into_owned()));
        let ir_err = outbound.parse_error(status, &body);
        return Err((ir_err.error_type.http_status(), inbound.build_error(&ir_err)));
    }

    let mut builder = inbound.create_stream_builder();
    let started = Instant::now();
    let route_id = route.id.clone();
    let proxy_path_for_log = route.proxy_path.clone();
    let state_for_log = Arc::clone(&state);

    let output = async_stream::stream! {
        let mut saw_terminal = false;
        loop {
            let next = tokio::select! {
                n = upstream.next() => n,
                _ = cancel.cancelled() => None,
            };
            let Some(chunk_result) = next else { break };
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(TransportError::Cancelled) => break,
                Err(_) => continue,
            };
            let events = match outbound.parse_stream(&chunk) {
                Ok(events) => events,
                Err(_) => continue,
            };
            for event in events {
                let terminal = event.is_terminal();
                for frame in builder.process(event) {
                    yield frame.to_wire();
                }
                if terminal {
                    saw_terminal = true;
                }
            }
        }
        for frame in builder.finalize() {
            yield frame.to_wire();
        }
        let status = if saw_terminal { 200 } else { 499 };
        let record = PartialLogRecord {
            route_id,
            proxy_path: proxy_path_for_log,
            source_model,
            target_model,
            input_tokens: None,
            output_tokens: None,
            error_message: if saw_terminal { None } else { Some("cancelled".to_string()) },
        };
        record_and_log(&state_for_log, record, started, status, if saw_terminal { None } else { Some("cancelled") });
    };

    Ok(output)
}

/// Accumulates the fields of a [`RequestLogRecord`] that are known before
/// the status/latency are, so every early-return error path can still log.
struct PartialLogRecord {
    route_id: String,
    proxy_path: String,
    source_model: Option<String>,
    target_model: Option<String>,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    error_message: Option<String>,
}

impl PartialLogRecord {
    fn bare(proxy_path: &str) -> Self {
        Self {
            route_id: String::new(),
            proxy_path: proxy_path.to_string(),
            source_model: None,
            target_model: None,
            input_tokens: None,
            output_tokens: None,
            error_message: None,
        }
    }

    fn for_route(route: &ProxyRoute) -> Self {
        Self {
            route_id: route.id.clone(),
            proxy_path: route.proxy_path.clone(),
            source_model: None,
            target_model: None,
            input_tokens: None,
            output_tokens: None,
            error_message: None,
        }
    }

    fn with_models(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_model = source;
        self.target_model = target;
        self
    }
}

fn record_and_log(state: &BridgeState, mut record: PartialLogRecord, started: Instant, status: u16, error_kind: Option<&str>) {
    let latency_ms = started.elapsed().as_millis() as u64;
    if let Some(kind) = error_kind {
        record.error_message.get_or_insert_with(|| kind.to_string());
    }
    state.metrics.record(latency_ms, status >= 400);
    state.sink.append(RequestLogRecord {
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
        route_id: record.route_id,
        proxy_path: record.proxy_path,
        source_model: record.source_model,
        target_model: record.target_model,
        status_code: status,
        input_tokens: record.input_tokens,
        output_tokens: record.output_tokens,
        latency_ms,
        error_message: record.error_message,
        request_body: None,
        response_body: None,
    });
}
