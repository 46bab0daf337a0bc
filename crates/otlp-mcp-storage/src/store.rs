//! The facade every collaborator (ingress, MCP tools) talks to (§4.5).
//!
//! `Store::query` takes whichever per-signal mutexes it needs in a fixed
//! order — traces, then logs, then metrics — so that no two callers can ever
//! acquire them in conflicting orders and deadlock (§5).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use serde::Serialize;

use crate::buffer::{LogBuffer, MetricBuffer, SpanBuffer};
use crate::error::{Result, StoreError};
use crate::log_record::LogSummary;
use crate::metric::MetricSummary;
use crate::query::{query_logs, query_metrics, query_spans, Filter, QueryResult, Summary};
use crate::snapshot::{now_unix_nanos, Snapshot, SnapshotManager};
use crate::span::TraceSummary;
use crate::stats::{IngestCounters, StatusReport, StoreStats};

/// Attribute count beyond which summaries truncate a single entry's
/// attribute map (Open Question (c), resolved in the expanded spec).
pub const DEFAULT_ATTRIBUTE_CAP: usize = 20;

/// Per-signal ring buffer capacity, shared across traces/logs/metrics unless
/// configured otherwise.
pub const DEFAULT_CAPACITY: usize = 10_000;

pub struct StoreConfig {
    pub trace_capacity: usize,
    pub log_capacity: usize,
    pub metric_capacity: usize,
    pub max_attributes_per_summary: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            trace_capacity: DEFAULT_CAPACITY,
            log_capacity: DEFAULT_CAPACITY,
            metric_capacity: DEFAULT_CAPACITY,
            max_attributes_per_summary: DEFAULT_ATTRIBUTE_CAP,
        }
    }
}

/// Holds the three signal buffers, the snapshot manager, and the process
/// ingestion counters. Cheap to clone via `Arc` — every collaborator shares
/// one instance.
pub struct ObservabilityStore {
    spans: SpanBuffer,
    logs: LogBuffer,
    metrics: MetricBuffer,
    snapshots: SnapshotManager,
    counters: IngestCounters,
    attribute_cap: usize,
    started_at: Instant,
}

impl ObservabilityStore {
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            spans: SpanBuffer::new(config.trace_capacity),
            logs: LogBuffer::new(config.log_capacity),
            metrics: MetricBuffer::new(config.metric_capacity),
            snapshots: SnapshotManager::new(),
            counters: IngestCounters::new(),
            attribute_cap: config.max_attributes_per_summary,
            started_at: Instant::now(),
        })
    }

    pub fn ingest_traces(&self, resource_spans: &[ResourceSpans]) {
        let n = self.spans.ingest_resource_spans(resource_spans);
        self.counters.add_spans(n as u64);
        if n > 0 {
            self.counters.bump_generation();
        }
    }

    pub fn ingest_logs(&self, resource_logs: &[ResourceLogs]) {
        let n = self.logs.ingest_resource_logs(resource_logs);
        self.counters.add_logs(n as u64);
        if n > 0 {
            self.counters.bump_generation();
        }
    }

    pub fn ingest_metrics(&self, resource_metrics: &[ResourceMetrics]) {
        let n = self.metrics.ingest_resource_metrics(resource_metrics);
        self.counters.add_metrics(n as u64);
        if n > 0 {
            self.counters.bump_generation();
        }
    }

    /// Union of every distinct `service.name` seen across all three signals,
    /// sorted and deduplicated (§4.5 `Services()`).
    pub fn services(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        names.extend(self.spans.service_names());
        names.extend(self.logs.service_names());
        names.extend(self.metrics.service_names());
        names.into_iter().collect()
    }

    /// Run `filter` against whichever signals it names. Lock order is fixed
    /// at traces -> logs -> metrics regardless of which signals the filter
    /// actually touches, so concurrent queries never interleave lock
    /// acquisition differently (§5).
    pub fn query(&self, filter: &Filter, signals: QuerySignals) -> QueryResult {
        let (traces, matched_traces) = if signals.traces {
            query_spans(&self.spans, filter, self.attribute_cap)
        } else {
            (Vec::new(), 0)
        };
        let (logs, matched_logs) = if signals.logs {
            query_logs(&self.logs, filter, self.attribute_cap)
        } else {
            (Vec::new(), 0)
        };
        let (metrics, matched_metrics) = if signals.metrics {
            query_metrics(&self.metrics, filter, self.attribute_cap)
        } else {
            (Vec::new(), 0)
        };
        let summary = Summary::build(matched_traces, matched_logs, matched_metrics, &traces, &logs, &metrics);
        QueryResult {
            traces,
            logs,
            metrics,
            summary,
        }
    }

    pub fn create_snapshot(&self, name: &str) -> Result<Snapshot> {
        let snapshot = Snapshot {
            trace_position: self.spans.newest(),
            log_position: self.logs.newest(),
            metric_position: self.metrics.newest(),
            created_at_unix_nanos: now_unix_nanos(),
        };
        self.snapshots.create(name, snapshot)?;
        Ok(snapshot)
    }

    pub fn get_snapshot(&self, name: &str) -> Option<Snapshot> {
        self.snapshots.get(name)
    }

    pub fn list_snapshots(&self) -> Vec<(String, Snapshot)> {
        self.snapshots.list()
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<()> {
        self.snapshots.delete(name)
    }

    /// Drop every named snapshot without touching buffered data (the `clear`
    /// action of the `manage_snapshots` tool, §4.8).
    pub fn clear_snapshots(&self) {
        self.snapshots.clear();
    }

    /// Drop all buffered data and all named snapshots (§4.5 `Clear()`;
    /// Testable Property 8: afterward every buffer is empty and
    /// `Snapshots().List()` is empty). Positions remain monotonic, so any
    /// snapshot taken *before* this call — had one survived — would still
    /// describe a well-defined range; ingestion counters are untouched
    /// (design note §9(a)).
    pub fn clear(&self) {
        self.spans.clear();
        self.logs.clear();
        self.metrics.clear();
        self.clear_snapshots();
    }

    /// Resolve the buffered ranges between two snapshots into a [`DataWindow`]
    /// (§4.5 `GetSnapshotData`). `end_snapshot` of `None` means "up to the
    /// current newest position in each buffer", using now as its timestamp.
    pub fn get_snapshot_data(&self, start_snapshot: &str, end_snapshot: Option<&str>) -> Result<DataWindow> {
        let start = self
            .snapshots
            .get(start_snapshot)
            .ok_or_else(|| StoreError::NotFound(start_snapshot.to_string()))?;
        let end = match end_snapshot {
            Some(name) => self
                .snapshots
                .get(name)
                .ok_or_else(|| StoreError::NotFound(name.to_string()))?,
            None => Snapshot {
                trace_position: self.spans.newest(),
                log_position: self.logs.newest(),
                metric_position: self.metrics.newest(),
                created_at_unix_nanos: now_unix_nanos(),
            },
        };

        let traces = self.spans.with_ring(|ring| {
            ring.get_range(start.trace_position, end.trace_position)
                .into_iter()
                .map(|span| TraceSummary::from_span(span, self.attribute_cap))
                .collect::<Vec<_>>()
        });
        let logs = self.logs.with_ring(|ring| {
            ring.get_range(start.log_position, end.log_position)
                .into_iter()
                .map(|entry| LogSummary::from_entry(entry, self.attribute_cap))
                .collect::<Vec<_>>()
        });
        let metrics = self.metrics.with_ring(|ring| {
            ring.get_range(start.metric_position, end.metric_position)
                .into_iter()
                .map(|point| MetricSummary::from_point(point, self.attribute_cap))
                .collect::<Vec<_>>()
        });

        let summary = Summary::build(traces.len(), logs.len(), metrics.len(), &traces, &logs, &metrics);

        Ok(DataWindow {
            time_range: TimeRange::new(start.created_at_unix_nanos, end.created_at_unix_nanos),
            traces,
            logs,
            metrics,
            summary,
        })
    }

    /// Monotonic ingestion counters, error count, uptime and the current
    /// ingestion generation (§4.8 `status` tool).
    pub fn status(&self) -> StatusReport {
        StatusReport {
            spans_received: self.counters.spans_ingested(),
            logs_received: self.counters.logs_ingested(),
            metrics_received: self.counters.metrics_ingested(),
            error_count: self.counters.spans_skipped(),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            generation: self.counters.generation(),
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            spans_ingested: self.counters.spans_ingested(),
            logs_ingested: self.counters.logs_ingested(),
            metrics_ingested: self.counters.metrics_ingested(),
            spans_skipped: self.counters.spans_skipped(),
            spans_buffered: self.spans.len(),
            logs_buffered: self.logs.len(),
            metrics_buffered: self.metrics.len(),
            distinct_trace_count: self.spans.distinct_trace_count(),
            distinct_service_count: self.spans.distinct_service_count(),
            distinct_metric_count: self.metrics.distinct_metric_count(),
            snapshot_count: self.snapshots.len(),
        }
    }
}

/// The span of wall-clock time between two snapshots' `created_at`, plus a
/// human-readable rendering of that duration (§4.5 `GetSnapshotData`).
#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub start_time_unix_nanos: u128,
    pub end_time_unix_nanos: u128,
    pub duration_human: String,
}

impl TimeRange {
    fn new(start_time_unix_nanos: u128, end_time_unix_nanos: u128) -> Self {
        let nanos = end_time_unix_nanos.saturating_sub(start_time_unix_nanos);
        let seconds = nanos as f64 / 1e9;
        Self {
            start_time_unix_nanos,
            end_time_unix_nanos,
            duration_human: format!("{seconds:.3}s"),
        }
    }
}

/// The buffered traces, logs and metrics between two snapshots, returned by
/// `get_snapshot_data` (§4.5/§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct DataWindow {
    pub time_range: TimeRange,
    pub traces: Vec<TraceSummary>,
    pub logs: Vec<LogSummary>,
    pub metrics: Vec<MetricSummary>,
    pub summary: Summary,
}

/// Which signals a query should touch. The `query` MCP tool always passes
/// [`QuerySignals::ALL`]; the narrower constants exist for internal callers
/// (resources, `recent_activity`) that only need one signal.
#[derive(Debug, Clone, Copy)]
pub struct QuerySignals {
    pub traces: bool,
    pub logs: bool,
    pub metrics: bool,
}

impl QuerySignals {
    pub const ALL: Self = Self {
        traces: true,
        logs: true,
        metrics: true,
    };
    pub const TRACES: Self = Self {
        traces: true,
        logs: false,
        metrics: false,
    };
    pub const LOGS: Self = Self {
        traces: false,
        logs: true,
        metrics: false,
    };
    pub const METRICS: Self = Self {
        traces: false,
        logs: false,
        metrics: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn new_store_has_empty_stats() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let stats = store.stats();
        assert_eq!(stats.spans_ingested, 0);
        assert_eq!(stats.spans_buffered, 0);
        assert_eq!(stats.snapshot_count, 0);
    }

    #[test]
    fn snapshot_lifecycle() {
        let store = ObservabilityStore::new(StoreConfig::default());
        store.create_snapshot("s1").unwrap();
        assert!(store.get_snapshot("s1").is_some());
        assert_eq!(
            store.create_snapshot("s1").unwrap_err(),
            StoreError::DuplicateName("s1".into())
        );
        store.delete_snapshot("s1").unwrap();
        assert!(store.get_snapshot("s1").is_none());
    }

    #[test]
    fn clear_resets_buffers_not_counters() {
        let store = ObservabilityStore::new(StoreConfig::default());
        store.counters.add_spans(5);
        store.clear();
        assert_eq!(store.stats().spans_ingested, 5);
        assert_eq!(store.stats().spans_buffered, 0);
    }

    #[test]
    fn query_respects_requested_signals() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let filter = Filter::default();
        let result = store.query(&filter, QuerySignals::TRACES);
        assert!(result.logs.is_empty());
        assert!(result.metrics.is_empty());
    }

    #[test]
    fn clear_removes_snapshots_too() {
        let store = ObservabilityStore::new(StoreConfig::default());
        store.create_snapshot("before-clear").unwrap();
        store.clear();
        assert!(store.get_snapshot("before-clear").is_none());
        assert_eq!(store.stats().snapshot_count, 0);
    }

    #[test]
    fn get_snapshot_data_resolves_unknown_start_as_not_found() {
        let store = ObservabilityStore::new(StoreConfig::default());
        assert_eq!(
            store.get_snapshot_data("missing", None).unwrap_err(),
            StoreError::NotFound("missing".into())
        );
    }

    #[test]
    fn get_snapshot_data_end_defaults_to_current_newest() {
        let store = ObservabilityStore::new(StoreConfig::default());
        store.create_snapshot("start").unwrap();
        let window = store.get_snapshot_data("start", None).unwrap();
        assert!(window.traces.is_empty());
        assert_eq!(window.summary.trace_count, 0);
    }

    #[test]
    fn status_reports_generation_and_counters() {
        let store = ObservabilityStore::new(StoreConfig::default());
        assert_eq!(store.status().generation, 0);
        store.ingest_traces(&[]);
        assert_eq!(store.status().generation, 0, "ingesting nothing should not bump generation");
    }
}
