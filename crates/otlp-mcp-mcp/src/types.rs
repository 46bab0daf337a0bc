//! `snake_case` JSON request/response shapes for the eleven MCP tools (§6.1).

use std::collections::HashMap;

use otlp_mcp_storage::query::Filter;
use otlp_mcp_storage::{DataWindow, LogSummary, MetricSummary, Snapshot, Summary, TimeRange, TraceSummary};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The single `query` tool's argument grammar (§4.6), mirroring [`Filter`]
/// field-for-field plus the two snapshot-name conveniences that resolve to
/// `Filter`'s raw position tuples.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct QueryArgs {
    pub service_name: Option<String>,
    pub trace_id: Option<String>,
    pub span_name: Option<String>,
    pub span_status: Option<String>,
    pub log_severity: Option<String>,
    pub metric_names: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub errors_only: bool,
    pub min_duration_ns: Option<u64>,
    pub max_duration_ns: Option<u64>,
    pub has_attribute: Option<String>,
    #[serde(default)]
    pub attribute_equals: HashMap<String, String>,
    /// Only include entries at or after this named snapshot's position.
    pub start_snapshot: Option<String>,
    /// Only include entries before this named snapshot's position. Unset
    /// means "up to the current newest" (§4.6).
    pub end_snapshot: Option<String>,
}

impl QueryArgs {
    /// Resolve `start_snapshot`/`end_snapshot` against `store` and build the
    /// signal-agnostic [`Filter`]. An unknown snapshot name leaves the
    /// corresponding bound unset rather than failing the whole query — the
    /// MCP tool surface never throws on user-visible failures (§6.1).
    pub fn into_filter(self, store: &otlp_mcp_storage::ObservabilityStore) -> Filter {
        let position_tuple = |name: &str| {
            store
                .get_snapshot(name)
                .map(|s| (s.trace_position, s.log_position, s.metric_position))
        };
        let snapshot_from = self.start_snapshot.as_deref().and_then(position_tuple);
        let snapshot_to = self.end_snapshot.as_deref().and_then(position_tuple);
        Filter {
            service_name: self.service_name,
            trace_id: self.trace_id,
            span_name: self.span_name,
            span_status: self.span_status,
            log_severity: self.log_severity,
            metric_names: self.metric_names,
            snapshot_from,
            snapshot_to,
            limit: self.limit,
            errors_only: self.errors_only,
            min_duration_ns: self.min_duration_ns,
            max_duration_ns: self.max_duration_ns,
            has_attribute: self.has_attribute,
            attribute_equals: self.attribute_equals,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SnapshotNameArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PortArgs {
    /// Wider than `u16` so an out-of-range value like `99999` deserializes
    /// successfully and can be reported as `InvalidPort` by the handler,
    /// rather than failing at the transport layer (§4.8, E4).
    pub port: u32,
    #[serde(default)]
    pub bind_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EndpointArgs {
    pub port: u16,
}

/// The `{success, message}` envelope used by every tool that can fail in a
/// way the spec calls "user-visible" rather than protocol-level (port and
/// snapshot management, §7): these never surface as MCP tool errors, they
/// surface as ordinary JSON the agent can read and react to.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeEnvelope<T> {
    pub success: bool,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", flatten)]
    pub data: Option<T>,
}

impl<T> OutcomeEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// `get_otlp_endpoint`'s response body (§6.1): the primary OTLP endpoint and
/// the environment variables an OTEL exporter would need to point at it.
#[derive(Debug, Clone, Serialize)]
pub struct OtlpEndpointInfo {
    pub endpoint: String,
    pub protocol: String,
    pub environment_vars: HashMap<String, String>,
}

impl OtlpEndpointInfo {
    pub fn for_addr(addr: std::net::SocketAddr) -> Self {
        let endpoint = format!("http://{addr}");
        let mut environment_vars = HashMap::new();
        environment_vars.insert("OTEL_EXPORTER_OTLP_ENDPOINT".to_string(), endpoint.clone());
        environment_vars.insert("OTEL_EXPORTER_OTLP_PROTOCOL".to_string(), "grpc".to_string());
        Self {
            endpoint,
            protocol: "grpc".to_string(),
            environment_vars,
        }
    }
}

/// `add_otlp_port`/`remove_otlp_port`'s response body (§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct PortMutationResult {
    pub success: bool,
    pub message: String,
    pub endpoints: Vec<String>,
}

/// `create_snapshot`'s response body (§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotCreated {
    pub name: String,
    pub trace_position: u64,
    pub log_position: u64,
    pub metric_position: u64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SnapshotDataArgs {
    pub start_snapshot: String,
    #[serde(default)]
    pub end_snapshot: Option<String>,
}

/// `get_snapshot_data`'s response body (§4.5/§6.1).
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDataResponse {
    pub start_snapshot: String,
    pub end_snapshot: Option<String>,
    pub time_range: TimeRange,
    pub traces: Vec<TraceSummary>,
    pub logs: Vec<LogSummary>,
    pub metrics: Vec<MetricSummary>,
    pub summary: Summary,
}

impl SnapshotDataResponse {
    pub fn new(start_snapshot: String, end_snapshot: Option<String>, window: DataWindow) -> Self {
        Self {
            start_snapshot,
            end_snapshot,
            time_range: window.time_range,
            traces: window.traces,
            logs: window.logs,
            metrics: window.metrics,
            summary: window.summary,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ManageSnapshotsArgs {
    pub action: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub trace_position: u64,
    pub log_position: u64,
    pub metric_position: u64,
}

impl SnapshotEntry {
    pub fn from_pair((name, snapshot): (String, Snapshot)) -> Self {
        Self {
            name,
            trace_position: snapshot.trace_position,
            log_position: snapshot.log_position,
            metric_position: snapshot.metric_position,
        }
    }
}

/// `manage_snapshots`'s response body (§6.1). `snapshots` is only populated
/// by the `list` action.
#[derive(Debug, Clone, Serialize)]
pub struct ManageSnapshotsResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshots: Option<Vec<SnapshotEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecentActivityArgs {
    pub limit: Option<usize>,
}

/// `recent_activity`'s response body (§4.8): deduplicated recent traces,
/// recent errors, a throughput estimate, and a metric snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct RecentActivityResponse {
    pub recent_traces: Vec<TraceSummary>,
    pub recent_errors: Vec<TraceSummary>,
    pub throughput_spans_per_sec: f64,
    pub metrics_snapshot: Vec<MetricSummary>,
}
