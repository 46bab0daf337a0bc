//! Multi-signal filter grammar and per-signal evaluation (§4.6).
//!
//! Each signal's evaluator picks its cheapest index first — trace id, then
//! service name, then (for metrics) metric name — and falls back to a full
//! scan of the live window only when none of those apply. Every evaluator
//! applies the same secondary predicates (attribute presence/equality, time
//! range) in the order they appear on [`Filter`], then truncates to `limit`
//! in chronological order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::buffer::{LogBuffer, MetricBuffer, SpanBuffer};
use crate::metric::MetricSummary;
use crate::span::TraceSummary;
use crate::log_record::LogSummary;

/// Default result cap when a query does not specify `limit` (§4.6).
pub const DEFAULT_LIMIT: usize = 100;

/// The filter grammar shared by traces, logs and metrics. Every field is
/// optional; signals ignore filters that don't apply to them (e.g. logs
/// ignore `span_status`). Field names are `snake_case` to match the MCP
/// tool surface's wire contract (§6.1) verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filter {
    pub service_name: Option<String>,
    pub trace_id: Option<String>,
    pub span_name: Option<String>,
    pub span_status: Option<String>,
    pub log_severity: Option<String>,
    pub metric_names: Option<Vec<String>>,
    pub snapshot_from: Option<(u64, u64, u64)>,
    pub snapshot_to: Option<(u64, u64, u64)>,
    pub limit: Option<usize>,
    pub errors_only: bool,
    pub min_duration_ns: Option<u64>,
    pub max_duration_ns: Option<u64>,
    pub has_attribute: Option<String>,
    #[serde(default)]
    pub attribute_equals: HashMap<String, String>,
}

impl Filter {
    /// `0` means unlimited (§4.6: "limit: max items returned per signal (0 =
    /// unlimited)"); an unset limit falls back to [`DEFAULT_LIMIT`].
    pub fn limit(&self) -> usize {
        match self.limit {
            Some(0) => usize::MAX,
            Some(n) => n,
            None => DEFAULT_LIMIT,
        }
    }

    /// `has_attribute` is a presence-only check; `attribute_equals` requires
    /// every (k, v) pair to match as a stringified value (§4.6, E5). Both
    /// predicates apply together when both are set.
    fn attribute_matches(&self, attributes: &serde_json::Map<String, Json>) -> bool {
        if let Some(key) = &self.has_attribute {
            if !attributes.contains_key(key) {
                return false;
            }
        }
        self.attribute_equals.iter().all(|(key, expected)| {
            attributes
                .get(key)
                .map(|v| json_scalar_eq(v, expected))
                .unwrap_or(false)
        })
    }
}

/// Which element of the `(trace_position, log_position, metric_position)`
/// snapshot tuple bounds this signal.
#[derive(Clone, Copy)]
enum SignalKind {
    Trace,
    Log,
    Metric,
}

fn position_bounds(filter: &Filter, signal: SignalKind) -> (Option<u64>, Option<u64>) {
    let pick = |t: &(u64, u64, u64)| match signal {
        SignalKind::Trace => t.0,
        SignalKind::Log => t.1,
        SignalKind::Metric => t.2,
    };
    (
        filter.snapshot_from.as_ref().map(pick),
        filter.snapshot_to.as_ref().map(pick),
    )
}

fn json_scalar_eq(value: &Json, expected: &str) -> bool {
    match value {
        Json::String(s) => s == expected,
        Json::Bool(b) => b.to_string() == expected,
        Json::Number(n) => n.to_string() == expected,
        _ => false,
    }
}

/// Aggregate counts (over the full matching set, before `limit` truncates
/// the returned lists) plus distinct service names and trace ids drawn from
/// the returned lists themselves (§6.1).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub trace_count: usize,
    pub log_count: usize,
    pub metric_count: usize,
    pub services: Vec<String>,
    pub trace_ids: Vec<String>,
}

impl Summary {
    pub fn build(
        trace_count: usize,
        log_count: usize,
        metric_count: usize,
        traces: &[TraceSummary],
        logs: &[LogSummary],
        metrics: &[MetricSummary],
    ) -> Self {
        let mut services: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        services.extend(traces.iter().map(|t| t.service_name.clone()));
        services.extend(logs.iter().map(|l| l.service_name.clone()));
        services.extend(metrics.iter().map(|m| m.service_name.clone()));

        let mut trace_ids: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        trace_ids.extend(traces.iter().map(|t| t.trace_id.clone()));
        trace_ids.extend(logs.iter().filter_map(|l| l.trace_id.clone()));

        Self {
            trace_count,
            log_count,
            metric_count,
            services: services.into_iter().collect(),
            trace_ids: trace_ids.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub traces: Vec<TraceSummary>,
    pub logs: Vec<LogSummary>,
    pub metrics: Vec<MetricSummary>,
    pub summary: Summary,
}

/// Evaluate `filter` against the span buffer. Index selection: `trace_id` if
/// present, else `service_name`, else a full scan of the live window.
pub fn query_spans(buffer: &SpanBuffer, filter: &Filter, attribute_cap: usize) -> (Vec<TraceSummary>, usize) {
    let (since, until) = position_bounds(filter, SignalKind::Trace);
    let candidates: Vec<u64> = if let Some(trace_id) = &filter.trace_id {
        buffer.positions_by_trace_id(trace_id)
    } else if let Some(service) = &filter.service_name {
        buffer.positions_by_service_name(service)
    } else {
        buffer.with_ring(|ring| (ring.oldest()..ring.newest()).collect())
    };

    let mut matched: Vec<TraceSummary> = buffer.with_ring(|ring| {
        let mut out = Vec::new();
        for pos in candidates {
            if since.is_some_and(|s| pos < s) || until.is_some_and(|u| pos >= u) {
                continue;
            }
            let Some(span) = ring.get(pos) else { continue };
            if let Some(service) = &filter.service_name {
                if &span.service_name != service {
                    continue;
                }
            }
            if let Some(name) = &filter.span_name {
                if &span.span_name != name {
                    continue;
                }
            }
            if let Some(status) = &filter.span_status {
                if &span.status != status {
                    continue;
                }
            }
            if filter.errors_only && span.status != "STATUS_CODE_ERROR" {
                continue;
            }
            let duration = span.duration_ns();
            if let Some(min) = filter.min_duration_ns {
                if duration < min {
                    continue;
                }
            }
            if let Some(max) = filter.max_duration_ns {
                if duration > max {
                    continue;
                }
            }
            if !filter.attribute_matches(&span.attributes) {
                continue;
            }
            out.push(TraceSummary::from_span(span, attribute_cap));
        }
        out
    });

    matched.sort_by_key(|s| s.start_time_unix_nano);
    let total = matched.len();
    matched.truncate(filter.limit());
    (matched, total)
}

/// Evaluate `filter` against the log buffer. Index selection: `trace_id`,
/// else `service_name`, else a full scan.
pub fn query_logs(buffer: &LogBuffer, filter: &Filter, attribute_cap: usize) -> (Vec<LogSummary>, usize) {
    let (since, until) = position_bounds(filter, SignalKind::Log);
    let candidates: Vec<u64> = if let Some(trace_id) = &filter.trace_id {
        buffer.positions_by_trace_id(trace_id)
    } else if let Some(service) = &filter.service_name {
        buffer.positions_by_service_name(service)
    } else {
        buffer.with_ring(|ring| (ring.oldest()..ring.newest()).collect())
    };

    let mut matched: Vec<LogSummary> = buffer.with_ring(|ring| {
        let mut out = Vec::new();
        for pos in candidates {
            if since.is_some_and(|s| pos < s) || until.is_some_and(|u| pos >= u) {
                continue;
            }
            let Some(entry) = ring.get(pos) else { continue };
            if let Some(service) = &filter.service_name {
                if &entry.service_name != service {
                    continue;
                }
            }
            if let Some(severity) = &filter.log_severity {
                if &entry.severity != severity {
                    continue;
                }
            }
            if !filter.attribute_matches(&entry.attributes) {
                continue;
            }
            out.push(LogSummary::from_entry(entry, attribute_cap));
        }
        out
    });

    matched.sort_by_key(|s| s.time_unix_nano);
    let total = matched.len();
    matched.truncate(filter.limit());
    (matched, total)
}

/// Evaluate `filter` against the metric buffer. Index selection: the
/// `metric_names` set if present, else `service_name`, else a full scan.
pub fn query_metrics(
    buffer: &MetricBuffer,
    filter: &Filter,
    attribute_cap: usize,
) -> (Vec<MetricSummary>, usize) {
    let (since, until) = position_bounds(filter, SignalKind::Metric);
    let candidates: Vec<u64> = if let Some(names) = &filter.metric_names {
        names
            .iter()
            .flat_map(|name| buffer.positions_by_metric_name(name))
            .collect()
    } else if let Some(service) = &filter.service_name {
        buffer.positions_by_service_name(service)
    } else {
        buffer.with_ring(|ring| (ring.oldest()..ring.newest()).collect())
    };

    let mut matched: Vec<MetricSummary> = buffer.with_ring(|ring| {
        let mut out = Vec::new();
        for pos in candidates {
            if since.is_some_and(|s| pos < s) || until.is_some_and(|u| pos >= u) {
                continue;
            }
            let Some(point) = ring.get(pos) else { continue };
            if let Some(service) = &filter.service_name {
                if &point.service_name != service {
                    continue;
                }
            }
            if let Some(names) = &filter.metric_names {
                if !names.contains(&point.metric_name) {
                    continue;
                }
            }
            let duration = 0u64;
            if let Some(min) = filter.min_duration_ns {
                if duration < min {
                    continue;
                }
            }
            if !filter.attribute_matches(&point.attributes) {
                continue;
            }
            out.push(MetricSummary::from_point(point, attribute_cap));
        }
        out
    });

    matched.sort_by_key(|s| s.timestamp_unix_nano);
    let total = matched.len();
    matched.truncate(filter.limit());
    (matched, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_applied_when_unset() {
        let filter = Filter::default();
        assert_eq!(filter.limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let filter = Filter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.limit(), usize::MAX);
    }

    #[test]
    fn has_attribute_is_presence_only() {
        let filter = Filter {
            has_attribute: Some("http.status_code".into()),
            ..Default::default()
        };
        let mut attrs = serde_json::Map::new();
        attrs.insert("http.status_code".into(), Json::from(500));
        assert!(filter.attribute_matches(&attrs));
        attrs.remove("http.status_code");
        assert!(!filter.attribute_matches(&attrs));
    }

    #[test]
    fn attribute_equals_requires_every_pair_to_match() {
        let mut equals = HashMap::new();
        equals.insert("http.status_code".to_string(), "500".to_string());
        equals.insert("http.method".to_string(), "GET".to_string());
        let filter = Filter {
            attribute_equals: equals,
            ..Default::default()
        };
        let mut attrs = serde_json::Map::new();
        attrs.insert("http.status_code".into(), Json::from(500));
        attrs.insert("http.method".into(), Json::String("GET".into()));
        assert!(filter.attribute_matches(&attrs));
        attrs.insert("http.method".into(), Json::String("POST".into()));
        assert!(!filter.attribute_matches(&attrs));
    }

    #[test]
    fn empty_attribute_equals_matches_everything() {
        let filter = Filter::default();
        assert!(filter.attribute_matches(&serde_json::Map::new()));
    }
}
