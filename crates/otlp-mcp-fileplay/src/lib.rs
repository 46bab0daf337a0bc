//! Replays a JSONL-recorded telemetry file into an [`ObservabilityStore`],
//! for demos and integration tests that need deterministic data without
//! standing up a real OTLP producer (§2, "File Source" external
//! collaborator).
//!
//! Each line is one [`Record`]; malformed lines are skipped and counted
//! rather than aborting the whole replay (ingestion-skip semantics mirror
//! the gRPC ingress's own tolerance for partial failure, §7).

use std::path::Path;
use std::sync::Arc;

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::{
    metric::Data, number_data_point, Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ScopeSpans, Span as ProtoSpan, Status as ProtoStatus};
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use otlp_mcp_storage::ObservabilityStore;
use serde::Deserialize;
use serde_json::Value as Json;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Error)]
pub enum FileplayError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error while reading file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
enum Record {
    Trace {
        service: String,
        trace_id: String,
        span_id: String,
        name: String,
        start_unix_nano: u64,
        end_unix_nano: u64,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        attributes: serde_json::Map<String, Json>,
    },
    Log {
        service: String,
        body: String,
        #[serde(default)]
        severity_number: i32,
        time_unix_nano: u64,
        #[serde(default)]
        attributes: serde_json::Map<String, Json>,
    },
    Metric {
        service: String,
        metric_name: String,
        value: f64,
        time_unix_nano: u64,
        #[serde(default)]
        unit: String,
        #[serde(default)]
        attributes: serde_json::Map<String, Json>,
    },
}

fn resource_for(service: &str) -> Resource {
    Resource {
        attributes: vec![KeyValue {
            key: "service.name".into(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(service.to_string())),
            }),
        }],
        dropped_attributes_count: 0,
        entity_refs: vec![],
    }
}

fn json_attrs_to_proto(attrs: &serde_json::Map<String, Json>) -> Vec<KeyValue> {
    attrs
        .iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Json::String(s) => any_value::Value::StringValue(s.clone()),
                Json::Bool(b) => any_value::Value::BoolValue(*b),
                Json::Number(n) if n.is_i64() => any_value::Value::IntValue(n.as_i64().unwrap()),
                Json::Number(n) => any_value::Value::DoubleValue(n.as_f64().unwrap_or_default()),
                _ => return None,
            };
            Some(KeyValue {
                key: k.clone(),
                value: Some(AnyValue { value: Some(value) }),
            })
        })
        .collect()
}

/// Replay every record in `path` into `store`. Returns `(ingested,
/// skipped)`.
pub async fn replay_file(store: &Arc<ObservabilityStore>, path: &Path) -> Result<(u64, u64), FileplayError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| FileplayError::Open {
            path: path.display().to_string(),
            source,
        })?;
    let mut lines = BufReader::new(file).lines();
    let (mut ingested, mut skipped) = (0u64, 0u64);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line) {
            Ok(record) => {
                apply_record(store, record);
                ingested += 1;
            }
            Err(err) => {
                tracing::warn!(%err, "skipping malformed fileplay record");
                skipped += 1;
            }
        }
    }
    Ok((ingested, skipped))
}

fn apply_record(store: &Arc<ObservabilityStore>, record: Record) {
    match record {
        Record::Trace {
            service,
            trace_id,
            span_id,
            name,
            start_unix_nano,
            end_unix_nano,
            status,
            attributes,
        } => {
            let code = match status.as_deref() {
                Some("ERROR") => 2,
                Some("OK") => 1,
                _ => 0,
            };
            let rs = ResourceSpans {
                resource: Some(resource_for(&service)),
                scope_spans: vec![ScopeSpans {
                    scope: None,
                    spans: vec![ProtoSpan {
                        trace_id: hex::decode(&trace_id).unwrap_or_default(),
                        span_id: hex::decode(&span_id).unwrap_or_default(),
                        trace_state: String::new(),
                        parent_span_id: vec![],
                        flags: 0,
                        name,
                        kind: 0,
                        start_time_unix_nano: start_unix_nano,
                        end_time_unix_nano: end_unix_nano,
                        attributes: json_attrs_to_proto(&attributes),
                        dropped_attributes_count: 0,
                        events: vec![],
                        dropped_events_count: 0,
                        links: vec![],
                        dropped_links_count: 0,
                        status: Some(ProtoStatus {
                            message: String::new(),
                            code,
                        }),
                    }],
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            };
            store.ingest_traces(&[rs]);
        }
        Record::Log {
            service,
            body,
            severity_number,
            time_unix_nano,
            attributes,
        } => {
            let rl = ResourceLogs {
                resource: Some(resource_for(&service)),
                scope_logs: vec![ScopeLogs {
                    scope: None,
                    log_records: vec![LogRecord {
                        time_unix_nano,
                        observed_time_unix_nano: time_unix_nano,
                        severity_number,
                        severity_text: String::new(),
                        body: Some(AnyValue {
                            value: Some(any_value::Value::StringValue(body)),
                        }),
                        attributes: json_attrs_to_proto(&attributes),
                        dropped_attributes_count: 0,
                        flags: 0,
                        trace_id: vec![],
                        span_id: vec![],
                        event_name: String::new(),
                    }],
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            };
            store.ingest_logs(&[rl]);
        }
        Record::Metric {
            service,
            metric_name,
            value,
            time_unix_nano,
            unit,
            attributes,
        } => {
            let rm = ResourceMetrics {
                resource: Some(resource_for(&service)),
                scope_metrics: vec![ScopeMetrics {
                    scope: None,
                    metrics: vec![Metric {
                        name: metric_name,
                        description: String::new(),
                        unit,
                        metadata: vec![],
                        data: Some(Data::Gauge(Gauge {
                            data_points: vec![NumberDataPoint {
                                attributes: json_attrs_to_proto(&attributes),
                                start_time_unix_nano: 0,
                                time_unix_nano,
                                exemplars: vec![],
                                flags: 0,
                                value: Some(number_data_point::Value::AsDouble(value)),
                            }],
                        })),
                    }],
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            };
            store.ingest_metrics(&[rm]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_mcp_storage::StoreConfig;
    use std::io::Write;

    #[tokio::test]
    async fn replays_mixed_signal_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"signal":"trace","service":"checkout","trace_id":"0102030405060708090a0b0c0d0e0f10","span_id":"0102030405060708","name":"charge","start_unix_nano":1,"end_unix_nano":2,"status":"OK"}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"signal":"log","service":"checkout","body":"payment captured","time_unix_nano":2}}"#
        )
        .unwrap();
        writeln!(file, "not json at all").unwrap();

        let store = ObservabilityStore::new(StoreConfig::default());
        let (ingested, skipped) = replay_file(&store, file.path()).await.unwrap();
        assert_eq!(ingested, 2);
        assert_eq!(skipped, 1);
        assert_eq!(store.stats().spans_ingested, 1);
        assert_eq!(store.stats().logs_ingested, 1);
    }
}
