//! Dynamic multi-port OTLP/gRPC ingress over a shared observability store.

pub mod error;
pub mod grpc;
pub mod ingress;
pub mod listener;

pub use error::{IngressError, Result};
pub use grpc::GrpcIngestService;
pub use ingress::Ingress;
pub use listener::{ListenerHandle, ListenerState};
