//! End-to-end scenarios exercising the full stack: OTLP/gRPC ingress wired to
//! the observability store, queried the way the MCP tool surface would.

use std::net::SocketAddr;
use std::sync::Arc;

use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};
use otlp_mcp_ingress::Ingress;
use otlp_mcp_storage::query::Filter;
use otlp_mcp_storage::store::QuerySignals;
use otlp_mcp_storage::{ObservabilityStore, StoreConfig};

fn free_addr() -> SocketAddr {
    let port = portpicker::pick_unused_port().expect("no free port");
    format!("127.0.0.1:{port}").parse().unwrap()
}

fn resource_spans(service: &str, trace_id: &str, name: &str, status_code: i32) -> ResourceSpans {
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
            spans: vec![Span {
                trace_id: hex::decode(trace_id).unwrap(),
                span_id: hex::decode("0102030405060708").unwrap(),
                trace_state: String::new(),
                parent_span_id: vec![],
                flags: 0,
                name: name.into(),
                kind: 0,
                start_time_unix_nano: 1,
                end_time_unix_nano: 2,
                attributes: vec![],
                dropped_attributes_count: 0,
                events: vec![],
                dropped_events_count: 0,
                links: vec![],
                dropped_links_count: 0,
                status: Some(Status {
                    message: String::new(),
                    code: status_code,
                }),
            }],
            schema_url: String::new(),
        }],
        schema_url: String::new(),
    }
}

/// E1: a span exported over real gRPC lands in the store and is retrievable
/// by trace id.
#[tokio::test]
async fn e1_otlp_export_is_queryable_by_trace_id() {
    let store = ObservabilityStore::new(StoreConfig::default());
    let addr = free_addr();
    let ingress = Ingress::bind(store.clone(), &[addr]).await.unwrap();

    let mut client = TraceServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();
    let trace_id = "0102030405060708090a0b0c0d0e0f10";
    client
        .export(ExportTraceServiceRequest {
            resource_spans: vec![resource_spans("checkout", trace_id, "charge", 1)],
        })
        .await
        .unwrap();

    let filter = Filter {
        trace_id: Some(trace_id.to_string()),
        ..Default::default()
    };
    let result = store.query(&filter, QuerySignals::TRACES);
    assert_eq!(result.traces.len(), 1);
    assert_eq!(result.traces[0].service_name, "checkout");

    ingress.stop().await;
}

/// E2: multiple OTLP listeners share the same store — a span exported to
/// either port is visible to every query.
#[tokio::test]
async fn e2_multiple_listeners_share_one_store() {
    let store = ObservabilityStore::new(StoreConfig::default());
    let first = free_addr();
    let ingress = Ingress::bind(store.clone(), &[first]).await.unwrap();
    let second = ingress.add_port(free_addr()).await.unwrap();

    let mut client_a = TraceServiceClient::connect(format!("http://{first}")).await.unwrap();
    let mut client_b = TraceServiceClient::connect(format!("http://{second}")).await.unwrap();

    client_a
        .export(ExportTraceServiceRequest {
            resource_spans: vec![resource_spans(
                "svc-a",
                "0102030405060708090a0b0c0d0e0f10",
                "op-a",
                1,
            )],
        })
        .await
        .unwrap();
    client_b
        .export(ExportTraceServiceRequest {
            resource_spans: vec![resource_spans(
                "svc-b",
                "100102030405060708090a0b0c0d0e0f",
                "op-b",
                1,
            )],
        })
        .await
        .unwrap();

    assert_eq!(store.stats().spans_ingested, 2);
    ingress.stop().await;
}

/// E3: `errorsOnly` and `spanStatus` filters narrow a multi-status trace set.
#[tokio::test]
async fn e3_error_filter_excludes_ok_spans() {
    let store = ObservabilityStore::new(StoreConfig::default());
    store.ingest_traces(&[
        resource_spans("svc", "0102030405060708090a0b0c0d0e0f10", "ok-op", 1),
        resource_spans("svc", "100102030405060708090a0b0c0d0e0f", "bad-op", 2),
    ]);

    let filter = Filter {
        errors_only: true,
        ..Default::default()
    };
    let result = store.query(&filter, QuerySignals::TRACES);
    assert_eq!(result.traces.len(), 1);
    assert_eq!(result.traces[0].span_name, "bad-op");
}

/// E4: a snapshot taken mid-stream bounds a query to only what came after.
#[tokio::test]
async fn e4_snapshot_bounds_a_query_window() {
    let store = ObservabilityStore::new(StoreConfig::default());
    store.ingest_traces(&[resource_spans(
        "svc",
        "0102030405060708090a0b0c0d0e0f10",
        "before",
        1,
    )]);
    store.create_snapshot("checkpoint").unwrap();
    store.ingest_traces(&[resource_spans(
        "svc",
        "100102030405060708090a0b0c0d0e0f",
        "after",
        1,
    )]);

    let snapshot = store.get_snapshot("checkpoint").unwrap();
    let filter = Filter {
        snapshot_from: Some((snapshot.trace_position, snapshot.log_position, snapshot.metric_position)),
        ..Default::default()
    };
    let result = store.query(&filter, QuerySignals::TRACES);
    assert_eq!(result.traces.len(), 1);
    assert_eq!(result.traces[0].span_name, "after");
}

/// E5: eviction under a small capacity keeps the index consistent — querying
/// by the evicted trace id returns nothing, and the still-live trace is
/// still found by id.
#[tokio::test]
async fn e5_eviction_keeps_trace_index_consistent() {
    let store = ObservabilityStore::new(StoreConfig {
        trace_capacity: 1,
        log_capacity: 1,
        metric_capacity: 1,
        max_attributes_per_summary: 20,
    });
    store.ingest_traces(&[resource_spans(
        "svc",
        "0102030405060708090a0b0c0d0e0f10",
        "evicted",
        1,
    )]);
    store.ingest_traces(&[resource_spans(
        "svc",
        "100102030405060708090a0b0c0d0e0f",
        "live",
        1,
    )]);

    let evicted = Filter {
        trace_id: Some("0102030405060708090a0b0c0d0e0f10".to_string()),
        ..Default::default()
    };
    assert!(store.query(&evicted, QuerySignals::TRACES).traces.is_empty());

    let live = Filter {
        trace_id: Some("100102030405060708090a0b0c0d0e0f".to_string()),
        ..Default::default()
    };
    assert_eq!(store.query(&live, QuerySignals::TRACES).traces.len(), 1);
}

/// E6: removing the ingress's last listener is refused, draining a
/// non-last listener is clean.
#[tokio::test]
async fn e6_last_port_removal_is_refused() {
    let store = ObservabilityStore::new(StoreConfig::default());
    let first = free_addr();
    let ingress = Ingress::bind(store, &[first]).await.unwrap();
    let second = ingress.add_port(free_addr()).await.unwrap();

    ingress.remove_port(second.port()).await.unwrap();
    assert!(ingress.remove_port(first.port()).await.is_err());
    ingress.stop().await;
}

/// Testable property: `clear()` empties buffers and removes every named
/// snapshot, but never resets ingestion counters.
#[tokio::test]
async fn clear_empties_buffers_and_snapshots_but_not_counters() {
    let store: Arc<ObservabilityStore> = ObservabilityStore::new(StoreConfig::default());
    store.ingest_traces(&[resource_spans(
        "svc",
        "0102030405060708090a0b0c0d0e0f10",
        "op",
        1,
    )]);
    store.create_snapshot("before-clear").unwrap();
    store.clear();
    assert!(store.get_snapshot("before-clear").is_none());
    assert_eq!(store.stats().snapshot_count, 0);
    assert_eq!(store.stats().spans_ingested, 1);
    assert_eq!(store.stats().spans_buffered, 0);
}
