//! The eleven MCP tool handlers (§4.8/§6.1), implemented as methods on
//! [`crate::session::McpSession`] via `rmcp`'s tool macros. Port and
//! snapshot management tools return a `{success, message}` JSON envelope on
//! failure rather than an MCP tool error, per the "never throw on
//! user-visible failures" contract (§4.8); the `query` tool returns its
//! result directly since an empty match is not a failure.

use rmcp::handler::server::tool::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{tool, tool_router};

use otlp_mcp_storage::store::QuerySignals;

use crate::session::McpSession;
use crate::types::{
    EndpointArgs, ManageSnapshotsArgs, ManageSnapshotsResult, OtlpEndpointInfo, OutcomeEnvelope,
    PortArgs, PortMutationResult, QueryArgs, RecentActivityArgs, RecentActivityResponse,
    SnapshotCreated, SnapshotDataArgs, SnapshotDataResponse, SnapshotEntry, SnapshotNameArgs,
};

fn json_result<T: serde::Serialize>(value: &T) -> CallToolResult {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"success\":false,\"message\":\"{e}\"}}"));
    CallToolResult::success(vec![Content::text(text)])
}

#[tool_router]
impl McpSession {
    #[tool(description = "Return the primary OTLP/gRPC endpoint and the OTEL exporter environment variables that point at it")]
    async fn get_otlp_endpoint(&self) -> CallToolResult {
        match self.ingress.primary_endpoint().await {
            Ok(addr) => json_result(&OtlpEndpointInfo::for_addr(addr)),
            Err(e) => json_result(&OutcomeEnvelope::<()>::err(e.to_string())),
        }
    }

    #[tool(description = "Bind a new OTLP/gRPC listener on the given port")]
    async fn add_otlp_port(&self, Parameters(args): Parameters<PortArgs>) -> CallToolResult {
        let host: std::net::IpAddr = match args
            .bind_address
            .as_deref()
            .unwrap_or("0.0.0.0")
            .parse()
        {
            Ok(ip) => ip,
            Err(e) => return json_result(&self.port_mutation_result(false, e.to_string()).await),
        };
        match self.ingress.add_port_number(host, args.port).await {
            Ok(addr) => json_result(&self.port_mutation_result(true, format!("listening on {addr}")).await),
            Err(e) => json_result(&self.port_mutation_result(false, e.to_string()).await),
        }
    }

    #[tool(description = "Drain and remove the OTLP/gRPC listener bound to the given port")]
    async fn remove_otlp_port(&self, Parameters(args): Parameters<EndpointArgs>) -> CallToolResult {
        match self.ingress.remove_port(args.port).await {
            Ok(()) => json_result(&self.port_mutation_result(true, format!("port {} removed", args.port)).await),
            Err(e) => json_result(&self.port_mutation_result(false, e.to_string()).await),
        }
    }

    #[tool(description = "Create a named snapshot bookmarking the current end of all three buffers")]
    async fn create_snapshot(&self, Parameters(args): Parameters<SnapshotNameArgs>) -> CallToolResult {
        match self.store.create_snapshot(&args.name) {
            Ok(snapshot) => json_result(&SnapshotCreated {
                name: args.name.clone(),
                trace_position: snapshot.trace_position,
                log_position: snapshot.log_position,
                metric_position: snapshot.metric_position,
                message: format!("snapshot '{}' created", args.name),
            }),
            Err(e) => json_result(&OutcomeEnvelope::<()>::err(e.to_string())),
        }
    }

    #[tool(description = "Query buffered traces, logs and metrics with one shared filter (service, trace id, attributes, snapshot range, ...)")]
    async fn query(&self, Parameters(args): Parameters<QueryArgs>) -> CallToolResult {
        let filter = args.into_filter(&self.store);
        let result = self.store.query(&filter, QuerySignals::ALL);
        json_result(&result)
    }

    #[tool(description = "Return buffered traces, logs and metrics between two named snapshots")]
    async fn get_snapshot_data(&self, Parameters(args): Parameters<SnapshotDataArgs>) -> CallToolResult {
        match self
            .store
            .get_snapshot_data(&args.start_snapshot, args.end_snapshot.as_deref())
        {
            Ok(window) => json_result(&SnapshotDataResponse::new(
                args.start_snapshot,
                args.end_snapshot,
                window,
            )),
            Err(e) => json_result(&OutcomeEnvelope::<()>::err(e.to_string())),
        }
    }

    #[tool(description = "List, delete, or clear named snapshots (action: \"list\" | \"delete\" | \"clear\")")]
    async fn manage_snapshots(&self, Parameters(args): Parameters<ManageSnapshotsArgs>) -> CallToolResult {
        match args.action.as_str() {
            "list" => {
                let snapshots = self
                    .store
                    .list_snapshots()
                    .into_iter()
                    .map(SnapshotEntry::from_pair)
                    .collect();
                json_result(&ManageSnapshotsResult {
                    success: true,
                    message: "ok".to_string(),
                    snapshots: Some(snapshots),
                })
            }
            "delete" => match &args.name {
                Some(name) => match self.store.delete_snapshot(name) {
                    Ok(()) => json_result(&ManageSnapshotsResult {
                        success: true,
                        message: format!("snapshot '{name}' deleted"),
                        snapshots: None,
                    }),
                    Err(e) => json_result(&ManageSnapshotsResult {
                        success: false,
                        message: e.to_string(),
                        snapshots: None,
                    }),
                },
                None => json_result(&ManageSnapshotsResult {
                    success: false,
                    message: "delete requires a name".to_string(),
                    snapshots: None,
                }),
            },
            "clear" => {
                self.store.clear_snapshots();
                json_result(&ManageSnapshotsResult {
                    success: true,
                    message: "all snapshots cleared".to_string(),
                    snapshots: None,
                })
            }
            other => json_result(&ManageSnapshotsResult {
                success: false,
                message: format!("unknown action '{other}'"),
                snapshots: None,
            }),
        }
    }

    #[tool(description = "Report buffer occupancy, distinct key counts and snapshot count")]
    async fn get_stats(&self) -> CallToolResult {
        json_result(&self.store.stats())
    }

    #[tool(description = "Drop all buffered spans, logs and metrics and all named snapshots; counters are unaffected")]
    async fn clear_data(&self) -> CallToolResult {
        self.store.clear();
        json_result(&OutcomeEnvelope::ok(()))
    }

    #[tool(description = "Report monotonic ingestion counters, error count, uptime and a generation number that changes whenever data is accepted")]
    async fn status(&self) -> CallToolResult {
        json_result(&self.store.status())
    }

    #[tool(description = "Deduplicated recent traces, recent errors, a throughput estimate, and a metric snapshot")]
    async fn recent_activity(&self, Parameters(args): Parameters<RecentActivityArgs>) -> CallToolResult {
        json_result(&self.build_recent_activity(args.limit))
    }
}

impl McpSession {
    async fn port_mutation_result(&self, success: bool, message: String) -> PortMutationResult {
        let endpoints = self
            .ingress
            .endpoints()
            .await
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        PortMutationResult {
            success,
            message,
            endpoints,
        }
    }

    fn build_recent_activity(&self, limit: Option<usize>) -> RecentActivityResponse {
        use otlp_mcp_storage::query::Filter;

        let limit = limit.unwrap_or(20);
        let recent = self.store.query(
            &Filter {
                limit: Some(limit),
                ..Default::default()
            },
            QuerySignals::TRACES,
        );
        let errors = self.store.query(
            &Filter {
                limit: Some(limit),
                errors_only: true,
                ..Default::default()
            },
            QuerySignals::TRACES,
        );
        let metrics = self.store.query(
            &Filter {
                limit: Some(limit),
                ..Default::default()
            },
            QuerySignals::METRICS,
        );

        let status = self.store.status();
        let throughput_spans_per_sec = if status.uptime_seconds > 0.0 {
            status.spans_received as f64 / status.uptime_seconds
        } else {
            0.0
        };

        RecentActivityResponse {
            recent_traces: dedup_latest_per_trace(recent.traces),
            recent_errors: dedup_latest_per_trace(errors.traces),
            throughput_spans_per_sec,
            metrics_snapshot: metrics.metrics,
        }
    }
}

/// Keep only the most recent span per `trace_id`, newest first — spans with
/// the same trace id are otherwise redundant for an "at a glance" view.
fn dedup_latest_per_trace(
    traces: Vec<otlp_mcp_storage::TraceSummary>,
) -> Vec<otlp_mcp_storage::TraceSummary> {
    use std::collections::HashMap;

    let mut latest: HashMap<String, otlp_mcp_storage::TraceSummary> = HashMap::new();
    for trace in traces {
        latest
            .entry(trace.trace_id.clone())
            .and_modify(|existing| {
                if trace.start_time_unix_nano > existing.start_time_unix_nano {
                    *existing = trace.clone();
                }
            })
            .or_insert(trace);
    }
    let mut out: Vec<_> = latest.into_values().collect();
    out.sort_by(|a, b| b.start_time_unix_nano.cmp(&a.start_time_unix_nano));
    out
}
