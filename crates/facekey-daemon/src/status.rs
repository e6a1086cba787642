//! Runtime status shared with the admin IPC

use parking_lot::RwLock;
use std::net::{IpAddr, SocketAddr};

/// Where the pairing server ended up listening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInfo {
    pub addr: SocketAddr,
    pub lan_ip: IpAddr,
}

impl ServerInfo {
    /// Pairing page address for a phone on the same network
    pub fn pairing_url(&self, token: &str) -> String {
        format!(
            "http://{}:{}/?token={}",
            self.lan_ip,
            self.addr.port(),
            token
        )
    }
}

/// Mutable daemon status
#[derive(Debug, Default)]
pub struct DaemonStatus {
    server: RwLock<Option<ServerInfo>>,
}

impl DaemonStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_server(&self, info: ServerInfo) {
        *self.server.write() = Some(info);
    }

    /// `None` until the pairing server has bound
    pub fn server(&self) -> Option<ServerInfo> {
        *self.server.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_pairing_url_format() {
        let info = ServerInfo {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7718)),
            lan_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        };
        assert_eq!(
            info.pairing_url("abcd"),
            "http://192.168.1.20:7718/?token=abcd"
        );
    }

    #[test]
    fn test_server_unset_until_bound() {
        let status = DaemonStatus::new();
        assert!(status.server().is_none());

        let info = ServerInfo {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 7717)),
            lan_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        status.set_server(info);
        assert_eq!(status.server(), Some(info));
    }
}
