//! Ring-buffered, position-addressable storage for OTLP traces, logs and
//! metrics, with snapshot-based temporal bookmarking and a multi-signal
//! query engine.
//!
//! This crate has no knowledge of gRPC or MCP — it is handed already-parsed
//! OTLP protobuf messages by `otlp-mcp-ingress` and returns plain structs and
//! `serde`-serializable summaries to whatever surface queries it.

pub mod attrs;
pub mod buffer;
pub mod error;
pub mod index;
pub mod log_record;
pub mod metric;
pub mod query;
pub mod resource;
pub mod ring;
pub mod snapshot;
pub mod span;
pub mod stats;
pub mod store;

pub use buffer::{LogBuffer, MetricBuffer, SpanBuffer};
pub use error::{Result, StoreError};
pub use log_record::{LogRecordEntry, LogSummary};
pub use metric::{MetricPoint, MetricSummary, MetricType, MetricValue};
pub use query::{Filter, QueryResult, Summary};
pub use ring::RingBuffer;
pub use snapshot::{Snapshot, SnapshotManager};
pub use span::{Span, TraceSummary};
pub use stats::{StatusReport, StoreStats};
pub use store::{
    DataWindow, ObservabilityStore, QuerySignals, StoreConfig, TimeRange, DEFAULT_ATTRIBUTE_CAP,
    DEFAULT_CAPACITY,
};
