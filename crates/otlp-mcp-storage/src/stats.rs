//! Process-lifetime ingestion counters and the `status` tool's summary shape.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic, process-lifetime counters — never reset by `Clear` (design
/// note §9(a): counters track everything ever ingested, buffers track only
/// what's currently live).
#[derive(Default)]
pub struct IngestCounters {
    spans_ingested: AtomicU64,
    logs_ingested: AtomicU64,
    metrics_ingested: AtomicU64,
    spans_skipped: AtomicU64,
    generation: AtomicU64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_spans(&self, n: u64) {
        self.spans_ingested.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_logs(&self, n: u64) {
        self.logs_ingested.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_metrics(&self, n: u64) {
        self.metrics_ingested.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_skipped(&self, n: u64) {
        self.spans_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn spans_ingested(&self) -> u64 {
        self.spans_ingested.load(Ordering::Relaxed)
    }

    pub fn logs_ingested(&self) -> u64 {
        self.logs_ingested.load(Ordering::Relaxed)
    }

    pub fn metrics_ingested(&self) -> u64 {
        self.metrics_ingested.load(Ordering::Relaxed)
    }

    pub fn spans_skipped(&self) -> u64 {
        self.spans_skipped.load(Ordering::Relaxed)
    }

    /// Bumped once per ingest call that actually accepted at least one item,
    /// across all three signals. `status` reports this so a caller can tell
    /// whether anything has changed since it last checked.
    pub fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }
}

/// The `status` tool's response body (§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub spans_ingested: u64,
    pub logs_ingested: u64,
    pub metrics_ingested: u64,
    pub spans_skipped: u64,
    pub spans_buffered: usize,
    pub logs_buffered: usize,
    pub metrics_buffered: usize,
    pub distinct_trace_count: usize,
    pub distinct_service_count: usize,
    pub distinct_metric_count: usize,
    pub snapshot_count: usize,
}

/// The `status` tool's response body (§4.8/§6.1) — monotonic counters, an
/// error count, process uptime, and a generation number that changes each
/// time any buffer accepts data. Distinct from [`StoreStats`], which reports
/// current buffer occupancy rather than process-lifetime activity.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub spans_received: u64,
    pub logs_received: u64,
    pub metrics_received: u64,
    pub error_count: u64,
    pub uptime_seconds: f64,
    pub generation: u64,
}
