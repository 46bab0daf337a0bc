//! The log signal's stored entry type and its OTLP ingestion path (§3).

use opentelemetry_proto::tonic::logs::v1::{SeverityNumber, ResourceLogs};
use serde::Serialize;
use serde_json::Map;

use crate::attrs::attributes_to_json;
use crate::resource::service_name_of;

/// One ingested log record.
#[derive(Debug, Clone)]
pub struct LogRecordEntry {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub service_name: String,
    pub severity: String,
    pub severity_number: i32,
    pub body: String,
    pub time_unix_nano: u64,
    pub attributes: Map<String, serde_json::Value>,
}

/// Severity name matching OTLP's `SeverityNumber` enum (`TRACE`, `DEBUG`,
/// `INFO`, `WARN`, `ERROR`, `FATAL`, each with numeric sub-levels 1-4
/// collapsed to the same name). `log_severity` (§4.6) matches this name
/// exactly, not by rank.
fn severity_name(n: i32) -> String {
    match SeverityNumber::try_from(n).unwrap_or(SeverityNumber::Unspecified) {
        SeverityNumber::Unspecified => "UNSPECIFIED".to_string(),
        SeverityNumber::Trace
        | SeverityNumber::Trace2
        | SeverityNumber::Trace3
        | SeverityNumber::Trace4 => "TRACE".to_string(),
        SeverityNumber::Debug
        | SeverityNumber::Debug2
        | SeverityNumber::Debug3
        | SeverityNumber::Debug4 => "DEBUG".to_string(),
        SeverityNumber::Info
        | SeverityNumber::Info2
        | SeverityNumber::Info3
        | SeverityNumber::Info4 => "INFO".to_string(),
        SeverityNumber::Warn
        | SeverityNumber::Warn2
        | SeverityNumber::Warn3
        | SeverityNumber::Warn4 => "WARN".to_string(),
        SeverityNumber::Error
        | SeverityNumber::Error2
        | SeverityNumber::Error3
        | SeverityNumber::Error4 => "ERROR".to_string(),
        SeverityNumber::Fatal
        | SeverityNumber::Fatal2
        | SeverityNumber::Fatal3
        | SeverityNumber::Fatal4 => "FATAL".to_string(),
    }
}

fn body_to_string(body: &Option<opentelemetry_proto::tonic::common::v1::AnyValue>) -> String {
    use opentelemetry_proto::tonic::common::v1::any_value::Value;
    match body.as_ref().and_then(|b| b.value.as_ref()) {
        Some(Value::StringValue(s)) => s.clone(),
        Some(other) => format!("{other:?}"),
        None => String::new(),
    }
}

/// Walk `ResourceLogs -> ScopeLogs -> LogRecord[]`, yielding one
/// [`LogRecordEntry`] per OTLP log record.
pub fn flatten_resource_logs(resource_logs: &[ResourceLogs]) -> Vec<LogRecordEntry> {
    let mut out = Vec::new();
    for rl in resource_logs {
        let service_name = service_name_of(rl.resource.as_ref());
        for scope_logs in &rl.scope_logs {
            for record in &scope_logs.log_records {
                let trace_id = if record.trace_id.is_empty() {
                    None
                } else {
                    Some(hex::encode(&record.trace_id))
                };
                let span_id = if record.span_id.is_empty() {
                    None
                } else {
                    Some(hex::encode(&record.span_id))
                };
                out.push(LogRecordEntry {
                    trace_id,
                    span_id,
                    service_name: service_name.clone(),
                    severity: severity_name(record.severity_number),
                    severity_number: record.severity_number,
                    body: body_to_string(&record.body),
                    time_unix_nano: record.time_unix_nano,
                    attributes: attributes_to_json(&record.attributes),
                });
            }
        }
    }
    out
}

/// MCP-facing projection of a [`LogRecordEntry`].
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub service_name: String,
    pub severity: String,
    pub body: String,
    pub time_unix_nano: u64,
    pub attributes: Map<String, serde_json::Value>,
}

impl LogSummary {
    pub fn from_entry(entry: &LogRecordEntry, attribute_cap: usize) -> Self {
        Self {
            trace_id: entry.trace_id.clone(),
            span_id: entry.span_id.clone(),
            service_name: entry.service_name.clone(),
            severity: entry.severity.clone(),
            body: entry.body.clone(),
            time_unix_nano: entry.time_unix_nano,
            attributes: entry
                .attributes
                .iter()
                .take(attribute_cap)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
