//! The ingress facade: a set of OTLP/gRPC listeners sharing one store,
//! managed by port (§4.7).

use std::net::SocketAddr;
use std::sync::Arc;

use otlp_mcp_storage::ObservabilityStore;
use tokio::sync::Mutex;

use crate::error::{IngressError, Result};
use crate::listener::{ListenerHandle, ListenerState};

/// Owns every bound OTLP listener. Behind one mutex (§5): adding or removing
/// a port is rare compared to the steady stream of `Export` RPCs the
/// listeners themselves handle independently, so serializing port changes
/// costs nothing in the hot path.
pub struct Ingress {
    store: Arc<ObservabilityStore>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl Ingress {
    /// Bind the initial set of OTLP listeners. At least one address must be
    /// given — an ingress with zero ports can never ingest anything.
    pub async fn bind(store: Arc<ObservabilityStore>, addrs: &[SocketAddr]) -> Result<Arc<Self>> {
        let mut listeners = Vec::with_capacity(addrs.len());
        for addr in addrs {
            listeners.push(ListenerHandle::bind(*addr, store.clone()).await?);
        }
        Ok(Arc::new(Self {
            store,
            listeners: Mutex::new(listeners),
        }))
    }

    /// Bind a new listener on `addr`, added to the live set.
    pub async fn add_port(&self, addr: SocketAddr) -> Result<SocketAddr> {
        let handle = ListenerHandle::bind(addr, self.store.clone()).await?;
        let bound = handle.addr;
        self.listeners.lock().await.push(handle);
        Ok(bound)
    }

    /// Validate `port` against the 1-65535 range before binding, so a
    /// structurally invalid request like `99999` surfaces as
    /// [`IngressError::InvalidPort`] instead of failing to even parse (§7,
    /// §4.8 "never throw on user-visible failures").
    pub async fn add_port_number(&self, ip: std::net::IpAddr, port: u32) -> Result<SocketAddr> {
        if port == 0 || port > u16::MAX as u32 {
            return Err(IngressError::InvalidPort(port));
        }
        self.add_port(SocketAddr::new(ip, port as u16)).await
    }

    /// The first listener bound, by convention the endpoint advertised to
    /// clients that want a single OTLP target (`get_otlp_endpoint`, §6.1).
    pub async fn primary_endpoint(&self) -> Result<SocketAddr> {
        self.listeners
            .lock()
            .await
            .first()
            .map(|l| l.addr)
            .ok_or(IngressError::NotFound(0))
    }

    /// Drain and remove the listener bound to `port`. Refuses to remove the
    /// last listener (§7 `LastPort`).
    pub async fn remove_port(&self, port: u16) -> Result<()> {
        let mut listeners = self.listeners.lock().await;
        if listeners.len() <= 1 {
            return Err(IngressError::LastPort);
        }
        let idx = listeners
            .iter()
            .position(|l| l.addr.port() == port)
            .ok_or(IngressError::NotFound(port))?;
        let handle = listeners.remove(idx);
        drop(listeners);
        handle.drain().await;
        Ok(())
    }

    /// Addresses of every listener currently `Serving`.
    pub async fn endpoints(&self) -> Vec<SocketAddr> {
        self.listeners
            .lock()
            .await
            .iter()
            .filter(|l| l.state() == ListenerState::Serving)
            .map(|l| l.addr)
            .collect()
    }

    /// The bound address for a specific port, if a listener owns it and is
    /// still serving.
    pub async fn endpoint(&self, port: u16) -> Result<SocketAddr> {
        let listeners = self.listeners.lock().await;
        let listener = listeners
            .iter()
            .find(|l| l.addr.port() == port)
            .ok_or(IngressError::NotFound(port))?;
        if listener.state() != ListenerState::Serving {
            return Err(IngressError::NotServing(port));
        }
        Ok(listener.addr)
    }

    /// Drain every listener. Idempotent in the sense that calling it on an
    /// already-empty ingress is a no-op.
    pub async fn stop(&self) {
        let mut listeners = self.listeners.lock().await;
        let drained: Vec<_> = listeners.drain(..).collect();
        drop(listeners);
        for handle in drained {
            handle.drain().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otlp_mcp_storage::StoreConfig;

    fn free_addr() -> SocketAddr {
        let port = portpicker::pick_unused_port().expect("no free port");
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[tokio::test]
    async fn bind_then_add_then_list_endpoints() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let first = free_addr();
        let ingress = Ingress::bind(store, &[first]).await.unwrap();
        let second = free_addr();
        ingress.add_port(second).await.unwrap();
        let mut endpoints = ingress.endpoints().await;
        endpoints.sort_by_key(|a| a.port());
        assert_eq!(endpoints.len(), 2);
    }

    #[tokio::test]
    async fn cannot_remove_the_last_port() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let addr = free_addr();
        let ingress = Ingress::bind(store, &[addr]).await.unwrap();
        assert!(matches!(
            ingress.remove_port(addr.port()).await,
            Err(IngressError::LastPort)
        ));
    }

    #[tokio::test]
    async fn add_port_number_rejects_out_of_range_values() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let addr = free_addr();
        let ingress = Ingress::bind(store, &[addr]).await.unwrap();
        let result = ingress.add_port_number(addr.ip(), 99999).await;
        assert!(matches!(result, Err(IngressError::InvalidPort(99999))));
    }

    #[tokio::test]
    async fn primary_endpoint_is_the_first_bound_listener() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let addr = free_addr();
        let ingress = Ingress::bind(store, &[addr]).await.unwrap();
        assert_eq!(ingress.primary_endpoint().await.unwrap(), addr);
    }

    #[tokio::test]
    async fn remove_unknown_port_is_not_found() {
        let store = ObservabilityStore::new(StoreConfig::default());
        let addr = free_addr();
        let second = free_addr();
        let ingress = Ingress::bind(store, &[addr, second]).await.unwrap();
        let bogus_port = portpicker::pick_unused_port().unwrap();
        assert!(matches!(
            ingress.remove_port(bogus_port).await,
            Err(IngressError::NotFound(_))
        ));
    }
}
