//! The three OTLP collector services, implemented once and registered
//! identically on every listener against the same store (§4.7).

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::logs::v1::{
    logs_service_server::LogsService, ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    metrics_service_server::MetricsService, ExportMetricsServiceRequest,
    ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    trace_service_server::TraceService, ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use otlp_mcp_storage::ObservabilityStore;
use tonic::{Request, Response, Status};

/// Shared OTLP Export handler, cloned cheaply (one `Arc` field) onto every
/// bound listener.
#[derive(Clone)]
pub struct GrpcIngestService {
    store: Arc<ObservabilityStore>,
}

impl GrpcIngestService {
    pub fn new(store: Arc<ObservabilityStore>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl TraceService for GrpcIngestService {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> std::result::Result<Response<ExportTraceServiceResponse>, Status> {
        let resource_spans = request.into_inner().resource_spans;
        tracing::debug!(count = resource_spans.len(), "received ExportTraceServiceRequest");
        self.store.ingest_traces(&resource_spans);
        Ok(Response::new(ExportTraceServiceResponse {
            partial_success: None,
        }))
    }
}

#[tonic::async_trait]
impl LogsService for GrpcIngestService {
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> std::result::Result<Response<ExportLogsServiceResponse>, Status> {
        let resource_logs = request.into_inner().resource_logs;
        tracing::debug!(count = resource_logs.len(), "received ExportLogsServiceRequest");
        self.store.ingest_logs(&resource_logs);
        Ok(Response::new(ExportLogsServiceResponse {
            partial_success: None,
        }))
    }
}

#[tonic::async_trait]
impl MetricsService for GrpcIngestService {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> std::result::Result<Response<ExportMetricsServiceResponse>, Status> {
        let resource_metrics = request.into_inner().resource_metrics;
        tracing::debug!(
            count = resource_metrics.len(),
            "received ExportMetricsServiceRequest"
        );
        self.store.ingest_metrics(&resource_metrics);
        Ok(Response::new(ExportMetricsServiceResponse {
            partial_success: None,
        }))
    }
}
