//! The trace signal's stored entry type and its OTLP ingestion path (§3).

use opentelemetry_proto::tonic::trace::v1::{status::StatusCode, ResourceSpans};
use serde::Serialize;
use serde_json::Map;

use crate::attrs::attributes_to_json;
use crate::resource::service_name_of;

/// One ingested span, with everything the query engine and MCP surface need
/// frozen at ingestion time.
#[derive(Debug, Clone)]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub service_name: String,
    pub span_name: String,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub status: String,
    pub attributes: Map<String, serde_json::Value>,
}

impl Span {
    /// `end - start`, saturating at zero if ingestion let an `end < start`
    /// span through (spec.md §3: "renderers clamp, ingestion does not
    /// reject").
    pub fn duration_ns(&self) -> u64 {
        self.end_time_unix_nano
            .saturating_sub(self.start_time_unix_nano)
    }
}

/// Human-readable status code name, matching spec.md's
/// `STATUS_CODE_{UNSET,OK,ERROR}` rendering.
fn status_name(code: i32) -> String {
    match StatusCode::try_from(code) {
        Ok(StatusCode::Ok) => "STATUS_CODE_OK".to_string(),
        Ok(StatusCode::Error) => "STATUS_CODE_ERROR".to_string(),
        Ok(StatusCode::Unset) => "STATUS_CODE_UNSET".to_string(),
        Err(_) => "STATUS_CODE_UNSET".to_string(),
    }
}

/// Walk `ResourceSpans -> ScopeSpans -> Span[]`, yielding one [`Span`] per
/// OTLP span. Malformed entries (unparseable ids) are skipped, never fatal
/// (§4.5 "IngestionSkipped").
pub fn flatten_resource_spans(resource_spans: &[ResourceSpans]) -> Vec<Span> {
    let mut out = Vec::new();
    for rs in resource_spans {
        let service_name = service_name_of(rs.resource.as_ref());
        for scope_spans in &rs.scope_spans {
            for span in &scope_spans.spans {
                let trace_id = hex::encode(&span.trace_id);
                let span_id = hex::encode(&span.span_id);
                if trace_id.is_empty() || span_id.is_empty() {
                    tracing::debug!("skipping span with empty trace/span id");
                    continue;
                }
                let parent_span_id = if span.parent_span_id.is_empty() {
                    None
                } else {
                    Some(hex::encode(&span.parent_span_id))
                };
                let status = span
                    .status
                    .as_ref()
                    .map(|s| status_name(s.code))
                    .unwrap_or_else(|| status_name(StatusCode::Unset as i32));
                out.push(Span {
                    trace_id,
                    span_id,
                    parent_span_id,
                    service_name: service_name.clone(),
                    span_name: span.name.clone(),
                    start_time_unix_nano: span.start_time_unix_nano,
                    end_time_unix_nano: span.end_time_unix_nano,
                    status,
                    attributes: attributes_to_json(&span.attributes),
                });
            }
        }
    }
    out
}

/// MCP-facing projection of a [`Span`], capped attribute map included.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub span_id: String,
    pub service_name: String,
    pub span_name: String,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub status: String,
    pub attributes: Map<String, serde_json::Value>,
}

impl TraceSummary {
    pub fn from_span(span: &Span, attribute_cap: usize) -> Self {
        let attributes = span
            .attributes
            .iter()
            .take(attribute_cap)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            trace_id: span.trace_id.clone(),
            span_id: span.span_id.clone(),
            service_name: span.service_name.clone(),
            span_name: span.span_name.clone(),
            start_time_unix_nano: span.start_time_unix_nano,
            end_time_unix_nano: span.end_time_unix_nano,
            status: span.status.clone(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};
    use opentelemetry_proto::tonic::resource::v1::Resource;
    use opentelemetry_proto::tonic::trace::v1::{ScopeSpans, Span as ProtoSpan, Status};

    fn sample_resource_spans(service: &str) -> ResourceSpans {
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
                    trace_id: hex::decode("0102030405060708090a0b0c0d0e0f10").unwrap(),
                    span_id: hex::decode("0102030405060708").unwrap(),
                    trace_state: String::new(),
                    parent_span_id: vec![],
                    flags: 0,
                    name: "e2e-test-span".into(),
                    kind: 0,
                    start_time_unix_nano: 1_000,
                    end_time_unix_nano: 1_000,
                    attributes: vec![],
                    dropped_attributes_count: 0,
                    events: vec![],
                    dropped_events_count: 0,
                    links: vec![],
                    dropped_links_count: 0,
                    status: Some(Status {
                        message: String::new(),
                        code: StatusCode::Ok as i32,
                    }),
                }],
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }
    }

    #[test]
    fn flattens_one_span_per_otlp_span() {
        let spans = flatten_resource_spans(&[sample_resource_spans("e2e-test-service")]);
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.trace_id, "0102030405060708090a0b0c0d0e0f10");
        assert_eq!(span.span_id, "0102030405060708");
        assert_eq!(span.service_name, "e2e-test-service");
        assert_eq!(span.status, "STATUS_CODE_OK");
        assert_eq!(span.duration_ns(), 0);
    }

    #[test]
    fn missing_service_name_falls_back_to_unknown() {
        let mut rs = sample_resource_spans("whatever");
        rs.resource = None;
        let spans = flatten_resource_spans(&[rs]);
        assert_eq!(spans[0].service_name, "unknown");
    }
}
