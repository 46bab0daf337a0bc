//! Error kinds surfaced at the ingress boundary (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngressError {
    /// A port number outside `1..=65535` (or zero) was requested. Holds the
    /// raw value as given, not clamped to `u16`, so the message reports
    /// exactly what the caller asked for (e.g. `add_otlp_port(99999)`).
    #[error("invalid port {0}")]
    InvalidPort(u32),

    /// The OS refused the bind (port in use by another process, permission
    /// denied, ...).
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `RemovePort`/`Endpoint` referenced a port this ingress has no
    /// listener for.
    #[error("no listener bound on port {0}")]
    NotFound(u16),

    /// The listener stopped accepting connections before the drain
    /// completed (liveness handshake never came back), or a caller asked for
    /// endpoint info on a listener mid-drain.
    #[error("listener on port {0} is not serving")]
    NotServing(u16),

    /// `RemovePort` was called on the last remaining listener — refused, a
    /// daemon with zero ingress ports can never receive new telemetry.
    #[error("cannot remove the last OTLP listener")]
    LastPort,
}

pub type Result<T> = std::result::Result<T, IngressError>;
