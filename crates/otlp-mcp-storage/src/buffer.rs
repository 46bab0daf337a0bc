//! Typed signal buffers: a [`crate::ring::RingBuffer`] plus the secondary
//! indices each signal needs, all behind one mutex per buffer (§4.1, §4.3,
//! §5 "one mutex per signal buffer").

use std::sync::Mutex;

use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;

use crate::index::CorrelationIndex;
use crate::log_record::{flatten_resource_logs, LogRecordEntry};
use crate::metric::{flatten_resource_metrics, MetricPoint};
use crate::ring::RingBuffer;
use crate::span::{flatten_resource_spans, Span};

struct SpanInner {
    ring: RingBuffer<Span>,
    by_trace_id: CorrelationIndex,
    by_service_name: CorrelationIndex,
}

/// Ring-buffered span storage, indexed by trace id and service name — the
/// two key spaces the query engine prefers over a full scan (§4.6).
pub struct SpanBuffer {
    inner: Mutex<SpanInner>,
}

impl SpanBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SpanInner {
                ring: RingBuffer::new(capacity),
                by_trace_id: CorrelationIndex::new(),
                by_service_name: CorrelationIndex::new(),
            }),
        }
    }

    /// Flatten and append every span in `resource_spans`, maintaining both
    /// indices in the same critical section as the ring append.
    pub fn ingest_resource_spans(&self, resource_spans: &[ResourceSpans]) -> usize {
        let spans = flatten_resource_spans(resource_spans);
        let count = spans.len();
        let mut inner = self.inner.lock().expect("span buffer mutex poisoned");
        for span in spans {
            let trace_id = span.trace_id.clone();
            let service_name = span.service_name.clone();
            let (position, evicted) = inner.ring.append(span);
            inner.by_trace_id.insert(&trace_id, position);
            inner.by_service_name.insert(&service_name, position);
            if let Some(evicted) = evicted {
                let evicted_position = position - inner.ring.capacity() as u64;
                inner.by_trace_id.evict(&evicted.trace_id, evicted_position);
                inner
                    .by_service_name
                    .evict(&evicted.service_name, evicted_position);
            }
        }
        count
    }

    pub fn with_ring<R>(&self, f: impl FnOnce(&RingBuffer<Span>) -> R) -> R {
        let inner = self.inner.lock().expect("span buffer mutex poisoned");
        f(&inner.ring)
    }

    pub fn positions_by_trace_id(&self, trace_id: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("span buffer mutex poisoned");
        inner.by_trace_id.positions(trace_id).to_vec()
    }

    pub fn positions_by_service_name(&self, service_name: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("span buffer mutex poisoned");
        inner.by_service_name.positions(service_name).to_vec()
    }

    pub fn distinct_trace_count(&self) -> usize {
        self.inner.lock().expect("span buffer mutex poisoned").by_trace_id.distinct_keys()
    }

    pub fn distinct_service_count(&self) -> usize {
        self.inner
            .lock()
            .expect("span buffer mutex poisoned")
            .by_service_name
            .distinct_keys()
    }

    /// The `n` most recently ingested spans, oldest of the bunch first.
    pub fn get_recent_n(&self, n: usize) -> Vec<Span> {
        let inner = self.inner.lock().expect("span buffer mutex poisoned");
        inner.ring.get_recent(n).into_iter().cloned().collect()
    }

    /// Every distinct `service.name` currently indexed by this buffer.
    pub fn service_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("span buffer mutex poisoned");
        inner.by_service_name.keys().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("span buffer mutex poisoned");
        inner.ring.clear();
        inner.by_trace_id.clear();
        inner.by_service_name.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("span buffer mutex poisoned").ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn newest(&self) -> u64 {
        self.inner.lock().expect("span buffer mutex poisoned").ring.newest()
    }
}

struct LogInner {
    ring: RingBuffer<LogRecordEntry>,
    by_trace_id: CorrelationIndex,
    by_service_name: CorrelationIndex,
}

/// Ring-buffered log storage, indexed by trace id (correlation with spans)
/// and service name.
pub struct LogBuffer {
    inner: Mutex<LogInner>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LogInner {
                ring: RingBuffer::new(capacity),
                by_trace_id: CorrelationIndex::new(),
                by_service_name: CorrelationIndex::new(),
            }),
        }
    }

    pub fn ingest_resource_logs(&self, resource_logs: &[ResourceLogs]) -> usize {
        let logs = flatten_resource_logs(resource_logs);
        let count = logs.len();
        let mut inner = self.inner.lock().expect("log buffer mutex poisoned");
        for log in logs {
            let trace_id = log.trace_id.clone();
            let service_name = log.service_name.clone();
            let (position, evicted) = inner.ring.append(log);
            if let Some(trace_id) = &trace_id {
                inner.by_trace_id.insert(trace_id, position);
            }
            inner.by_service_name.insert(&service_name, position);
            if let Some(evicted) = evicted {
                let evicted_position = position - inner.ring.capacity() as u64;
                if let Some(trace_id) = &evicted.trace_id {
                    inner.by_trace_id.evict(trace_id, evicted_position);
                }
                inner
                    .by_service_name
                    .evict(&evicted.service_name, evicted_position);
            }
        }
        count
    }

    pub fn with_ring<R>(&self, f: impl FnOnce(&RingBuffer<LogRecordEntry>) -> R) -> R {
        let inner = self.inner.lock().expect("log buffer mutex poisoned");
        f(&inner.ring)
    }

    pub fn positions_by_trace_id(&self, trace_id: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("log buffer mutex poisoned");
        inner.by_trace_id.positions(trace_id).to_vec()
    }

    pub fn positions_by_service_name(&self, service_name: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("log buffer mutex poisoned");
        inner.by_service_name.positions(service_name).to_vec()
    }

    /// The `n` most recently ingested log records, oldest of the bunch first.
    pub fn get_recent_n(&self, n: usize) -> Vec<LogRecordEntry> {
        let inner = self.inner.lock().expect("log buffer mutex poisoned");
        inner.ring.get_recent(n).into_iter().cloned().collect()
    }

    /// Every distinct `service.name` currently indexed by this buffer.
    pub fn service_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("log buffer mutex poisoned");
        inner.by_service_name.keys().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("log buffer mutex poisoned");
        inner.ring.clear();
        inner.by_trace_id.clear();
        inner.by_service_name.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("log buffer mutex poisoned").ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn newest(&self) -> u64 {
        self.inner.lock().expect("log buffer mutex poisoned").ring.newest()
    }
}

struct MetricInner {
    ring: RingBuffer<MetricPoint>,
    by_metric_name: CorrelationIndex,
    by_service_name: CorrelationIndex,
}

/// Ring-buffered metric point storage, indexed by metric name (the
/// highest-priority index after trace id, per §4.6) and service name.
pub struct MetricBuffer {
    inner: Mutex<MetricInner>,
}

impl MetricBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(MetricInner {
                ring: RingBuffer::new(capacity),
                by_metric_name: CorrelationIndex::new(),
                by_service_name: CorrelationIndex::new(),
            }),
        }
    }

    pub fn ingest_resource_metrics(&self, resource_metrics: &[ResourceMetrics]) -> usize {
        let points = flatten_resource_metrics(resource_metrics);
        let count = points.len();
        let mut inner = self.inner.lock().expect("metric buffer mutex poisoned");
        for point in points {
            let metric_name = point.metric_name.clone();
            let service_name = point.service_name.clone();
            let (position, evicted) = inner.ring.append(point);
            inner.by_metric_name.insert(&metric_name, position);
            inner.by_service_name.insert(&service_name, position);
            if let Some(evicted) = evicted {
                let evicted_position = position - inner.ring.capacity() as u64;
                inner.by_metric_name.evict(&evicted.metric_name, evicted_position);
                inner
                    .by_service_name
                    .evict(&evicted.service_name, evicted_position);
            }
        }
        count
    }

    pub fn with_ring<R>(&self, f: impl FnOnce(&RingBuffer<MetricPoint>) -> R) -> R {
        let inner = self.inner.lock().expect("metric buffer mutex poisoned");
        f(&inner.ring)
    }

    pub fn positions_by_metric_name(&self, metric_name: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("metric buffer mutex poisoned");
        inner.by_metric_name.positions(metric_name).to_vec()
    }

    pub fn positions_by_service_name(&self, service_name: &str) -> Vec<u64> {
        let inner = self.inner.lock().expect("metric buffer mutex poisoned");
        inner.by_service_name.positions(service_name).to_vec()
    }

    pub fn distinct_metric_count(&self) -> usize {
        self.inner
            .lock()
            .expect("metric buffer mutex poisoned")
            .by_metric_name
            .distinct_keys()
    }

    /// The `n` most recently ingested metric points, oldest of the bunch first.
    pub fn get_recent_n(&self, n: usize) -> Vec<MetricPoint> {
        let inner = self.inner.lock().expect("metric buffer mutex poisoned");
        inner.ring.get_recent(n).into_iter().cloned().collect()
    }

    /// Every distinct `service.name` currently indexed by this buffer.
    pub fn service_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("metric buffer mutex poisoned");
        inner.by_service_name.keys().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("metric buffer mutex poisoned");
        inner.ring.clear();
        inner.by_metric_name.clear();
        inner.by_service_name.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("metric buffer mutex poisoned").ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn newest(&self) -> u64 {
        self.inner.lock().expect("metric buffer mutex poisoned").ring.newest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};
    use opentelemetry_proto::tonic::resource::v1::Resource;
    use opentelemetry_proto::tonic::trace::v1::{ScopeSpans, Span as ProtoSpan};

    fn resource_spans_for(trace_id: &str, service: &str) -> ResourceSpans {
        ResourceSpans {
            resource: Some(Resource {
                attributes: vec![KeyValue {
                    key: "service.name".into(),
                    value: Some(AnyValue {
                        value: Some(Value::StringValue(service.into())),
                    }),
                }],
                dropped_attributes_count: 0,
                entity_refs: vec![],
            }),
            scope_spans: vec![ScopeSpans {
                scope: None,
                spans: vec![ProtoSpan {
                    trace_id: hex::decode(trace_id).unwrap(),
                    span_id: hex::decode("0102030405060708").unwrap(),
                    trace_state: String::new(),
                    parent_span_id: vec![],
                    flags: 0,
                    name: "span".into(),
                    kind: 0,
                    start_time_unix_nano: 0,
                    end_time_unix_nano: 0,
                    attributes: vec![],
                    dropped_attributes_count: 0,
                    events: vec![],
                    dropped_events_count: 0,
                    links: vec![],
                    dropped_links_count: 0,
                    status: None,
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }

    #[test]
    fn ingest_and_index_by_trace_id() {
        let buf = SpanBuffer::new(2);
        buf.ingest_resource_spans(&[resource_spans_for(
            "0102030405060708090a0b0c0d0e0f10",
            "svc",
        )]);
        let positions = buf.positions_by_trace_id("0102030405060708090a0b0c0d0e0f10");
        assert_eq!(positions, vec![0]);
        assert_eq!(buf.distinct_trace_count(), 1);
        assert_eq!(buf.distinct_service_count(), 1);
    }

    #[test]
    fn eviction_removes_stale_index_entries() {
        let buf = SpanBuffer::new(1);
        buf.ingest_resource_spans(&[resource_spans_for(
            "0102030405060708090a0b0c0d0e0f10",
            "svc-a",
        )]);
        buf.ingest_resource_spans(&[resource_spans_for(
            "100102030405060708090a0b0c0d0e0f",
            "svc-b",
        )]);
        assert!(buf
            .positions_by_trace_id("0102030405060708090a0b0c0d0e0f10")
            .is_empty());
        assert_eq!(
            buf.positions_by_trace_id("100102030405060708090a0b0c0d0e0f"),
            vec![1]
        );
        assert_eq!(buf.distinct_trace_count(), 1);
    }

    #[test]
    fn get_recent_n_and_service_names() {
        let buf = SpanBuffer::new(4);
        buf.ingest_resource_spans(&[resource_spans_for(
            "0102030405060708090a0b0c0d0e0f10",
            "svc-a",
        )]);
        buf.ingest_resource_spans(&[resource_spans_for(
            "100102030405060708090a0b0c0d0e0f",
            "svc-b",
        )]);
        let recent = buf.get_recent_n(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].service_name, "svc-b");
        let mut names = buf.service_names();
        names.sort();
        assert_eq!(names, vec!["svc-a", "svc-b"]);
    }
}
