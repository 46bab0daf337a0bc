//! One bound OTLP gRPC listener and its Bound -> Serving -> Draining ->
//! Stopped lifecycle (§4.7).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opentelemetry_proto::tonic::collector::logs::v1::logs_service_server::LogsServiceServer;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_server::MetricsServiceServer;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::TraceServiceServer;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::{IngressError, Result};
use crate::grpc::GrpcIngestService;

/// How many times the post-bind liveness handshake retries a TCP connect
/// before giving up.
const LIVENESS_ATTEMPTS: u32 = 10;
/// Delay between liveness handshake attempts (10 * 5ms = 50ms total, per
/// §4.7's "~50ms total, ~5ms between attempts").
const LIVENESS_RETRY_DELAY: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ListenerState {
    Bound = 0,
    Serving = 1,
    Draining = 2,
    Stopped = 3,
}

impl From<u8> for ListenerState {
    fn from(v: u8) -> Self {
        match v {
            0 => ListenerState::Bound,
            1 => ListenerState::Serving,
            2 => ListenerState::Draining,
            _ => ListenerState::Stopped,
        }
    }
}

/// A single bound and (once live) serving OTLP gRPC listener.
pub struct ListenerHandle {
    pub addr: SocketAddr,
    state: AtomicU8,
    cancel: CancellationToken,
    join_handle: tokio::task::JoinHandle<()>,
}

impl ListenerHandle {
    /// Bind `addr`, spawn the three OTLP services on it, and confirm the
    /// listener actually accepts connections before returning — a
    /// `tokio::task::spawn` alone does not guarantee the server's accept
    /// loop has started by the time the caller acts on "success".
    pub async fn bind(addr: SocketAddr, store: Arc<otlp_mcp_storage::ObservabilityStore>) -> Result<Self> {
        let std_listener = std::net::TcpListener::bind(addr).map_err(|source| IngressError::BindFailed {
            addr,
            source,
        })?;
        std_listener
            .set_nonblocking(true)
            .map_err(|source| IngressError::BindFailed { addr, source })?;
        let bound_addr = std_listener.local_addr().map_err(|source| IngressError::BindFailed { addr, source })?;
        let tokio_listener =
            tokio::net::TcpListener::from_std(std_listener).map_err(|source| IngressError::BindFailed { addr, source })?;
        let incoming = tokio_stream::wrappers::TcpListenerStream::new(tokio_listener);

        let service = GrpcIngestService::new(store);
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();

        let join_handle = tokio::spawn(async move {
            let result = tonic::transport::Server::builder()
                .add_service(TraceServiceServer::new(service.clone()))
                .add_service(LogsServiceServer::new(service.clone()))
                .add_service(MetricsServiceServer::new(service))
                .serve_with_incoming_shutdown(incoming, shutdown.cancelled())
                .await;
            if let Err(err) = result {
                tracing::warn!(%err, "OTLP listener exited with an error");
            }
        });

        let handle = Self {
            addr: bound_addr,
            state: AtomicU8::new(ListenerState::Bound as u8),
            cancel,
            join_handle,
        };
        handle.wait_until_live().await?;
        handle.state.store(ListenerState::Serving as u8, Ordering::SeqCst);
        Ok(handle)
    }

    async fn wait_until_live(&self) -> Result<()> {
        for _ in 0..LIVENESS_ATTEMPTS {
            if TcpStream::connect(self.addr).await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(LIVENESS_RETRY_DELAY).await;
        }
        Err(IngressError::NotServing(self.addr.port()))
    }

    pub fn state(&self) -> ListenerState {
        ListenerState::from(self.state.load(Ordering::SeqCst))
    }

    /// Begin graceful shutdown: in-flight RPCs finish, new connections are
    /// refused. Idempotent.
    pub async fn drain(self) {
        self.state.store(ListenerState::Draining as u8, Ordering::SeqCst);
        self.cancel.cancel();
        let _ = self.join_handle.await;
        self.state.store(ListenerState::Stopped as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_mcp_storage::{ObservabilityStore, StoreConfig};

    #[tokio::test]
    async fn bind_transitions_straight_to_serving() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let port = portpicker::pick_unused_port().expect("no free port");
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let handle = ListenerHandle::bind(addr, store).await.unwrap();
        assert_eq!(handle.state(), ListenerState::Serving);
        handle.drain().await;
    }

    #[tokio::test]
    async fn drain_is_reachable_after_serving() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let port = portpicker::pick_unused_port().expect("no free port");
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let handle = ListenerHandle::bind(addr, store).await.unwrap();
        handle.drain().await;
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
