//! Request log record and metrics accumulator.
//!
//! The persistent log store is an external collaborator — the engine does
//! not itself persist; this module only defines the record shape, the
//! append-only sink interface, and an in-process counter set for the
//! metrics accumulator shared resource.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One row emitted per completed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogRecord {
    pub timestamp_ms: i64,
    pub route_id: String,
    pub proxy_path: String,
    pub source_model: Option<String>,
    pub target_model: Option<String>,
    pub status_code: u16,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<serde_json::Value>,
}

/// The external log store's interface: append, never read back or mutate.
pub trait AppendOnlySink: Send + Sync {
    fn append(&self, record: RequestLogRecord);
}

/// Emits each record as a structured `tracing` event; the deployment's log
/// pipeline (external to this crate) captures it from there.
pub struct TracingSink;

impl AppendOnlySink for TracingSink {
    fn append(&self, record: RequestLogRecord) {
        tracing::info!(
            route_id = %record.route_id,
            proxy_path = %record.proxy_path,
            source_model = record.source_model.as_deref().unwrap_or(""),
            target_model = record.target_model.as_deref().unwrap_or(""),
            status_code = record.status_code,
            latency_ms = record.latency_ms,
            error = record.error_message.as_deref().unwrap_or(""),
            "request completed"
        );
    }
}

/// An in-memory sink for tests, keeping every record appended to it.
#[derive(Default)]
pub struct MemorySink {
    records: std::sync::Mutex<Vec<RequestLogRecord>>,
}

impl AppendOnlySink for MemorySink {
    fn append(&self, record: RequestLogRecord) {
        self.records.lock().expect("memory sink mutex poisoned").push(record);
    }
}

impl MemorySink {
    pub fn records(&self) -> Vec<RequestLogRecord> {
        self.records.lock().expect("memory sink mutex poisoned").clone()
    }
}

/// Lock-free per-route counters, the "metrics accumulator" shared resource.
#[derive(Default)]
pub struct MetricsAccumulator {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    latency_ms_total: AtomicU64,
}

impl MetricsAccumulator {
    pub fn record(&self, latency_ms: u64, is_error: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.latency_ms_total.fetch_add(latency_ms, Ordering::Relaxed);
        if is_error {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            latency_ms_total: self.latency_ms_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub latency_ms_total: u64,
}

pub type SharedMetrics = Arc<MetricsAccumulator>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_counts_and_latency() {
        let m = MetricsAccumulator::default();
        m.record(10, false);
        m.record(20, true);
        let snap = m.snapshot();
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.errors_total, 1);
        assert_eq!(snap.latency_ms_total, 30);
    }

    #[test]
    fn memory_sink_retains_records() {
        let sink = MemorySink::default();
        sink.append(RequestLogRecord {
            timestamp_ms: 0,
            route_id: "r1".into(),
            proxy_path: "p1".into(),
            source_model: None,
            target_model: None,
            status_code: 200,
            input_tokens: None,
            output_tokens: None,
            latency_ms: 5,
            error_message: None,
            request_body: None,
            response_body: None,
        });
        assert_eq!(sink.records().len(), 1);
    }
}
