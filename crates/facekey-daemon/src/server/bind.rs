//! Port selection for the pairing server

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::{DaemonError, Result};

/// Bind `host:base`, moving to the next port while the current one is taken
///
/// Only `AddrInUse` advances to the next port. Any other bind error (notably
/// `PermissionDenied`) aborts immediately.
pub async fn bind_with_retry(host: &str, base: u16, attempts: u16) -> Result<TcpListener> {
    let mut last = base;

    for offset in 0..attempts {
        let Some(port) = base.checked_add(offset) else {
            break;
        };
        last = port;

        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                info!("Pairing server bound to port {}", port);
                return Ok(listener);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                warn!("Port {} is in use, trying the next one", port);
            }
            Err(e) => {
                return Err(DaemonError::PortBind {
                    port,
                    kind: e.kind(),
                });
            }
        }
    }

    Err(DaemonError::PortsExhausted { first: base, last })
}

/// Address a phone on the LAN can reach us at
///
/// Connecting a UDP socket sends nothing; it only selects the outbound
/// interface. Falls back to loopback when there is no route.
pub fn lan_ip() -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);

    let Ok(socket) = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)) else {
        return fallback;
    };
    if socket.connect(("8.8.8.8", 80)).is_err() {
        return fallback;
    }
    socket.local_addr().map(|addr| addr.ip()).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_busy_base_port_moves_to_next() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = occupied.local_addr().unwrap().port();

        let listener = bind_with_retry("127.0.0.1", base, 10).await.unwrap();
        let bound = listener.local_addr().unwrap().port();

        assert_ne!(bound, base);
        assert!(bound > base && bound < base + 10);
    }

    #[tokio::test]
    async fn test_free_base_port_is_used() {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = probe.local_addr().unwrap().port();
        drop(probe);

        let listener = bind_with_retry("127.0.0.1", base, 1).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), base);
    }

    #[tokio::test]
    async fn test_all_ports_busy_is_exhausted() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = occupied.local_addr().unwrap().port();

        let err = bind_with_retry("127.0.0.1", base, 1).await.unwrap_err();
        match err {
            DaemonError::PortsExhausted { first, last } => {
                assert_eq!(first, base);
                assert_eq!(last, base);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_local_address_aborts_without_retry() {
        let err = bind_with_retry("203.0.113.1", 40000, 10).await.unwrap_err();
        assert!(matches!(err, DaemonError::PortBind { port: 40000, .. }));
    }

    #[test]
    fn test_lan_ip_is_never_unspecified() {
        assert!(!lan_ip().is_unspecified());
    }
}
