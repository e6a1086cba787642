//! Owner-only admin socket

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::net::{UnixListener, UnixStream};

use crate::error::{DaemonError, Result};

/// Listening end of the admin socket
///
/// Anyone who can open the socket can read back the stored password, so the
/// file is restricted to the owning user before the first `accept`.
pub struct AdminSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl AdminSocket {
    /// Bind `path`, replacing a stale socket left by a previous run
    pub fn bind(path: &Path) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path)
            .map_err(|e| DaemonError::Ipc(format!("Failed to bind socket: {}", e)))?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;

        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _) = self
            .listener
            .accept()
            .await
            .map_err(|e| DaemonError::Ipc(format!("Accept failed: {}", e)))?;
        Ok(stream)
    }
}

/// Open a connection to a running daemon
///
/// A missing socket file or a refused connection both mean no daemon is
/// listening and map to "Daemon not running".
pub async fn connect(path: &Path) -> Result<UnixStream> {
    UnixStream::connect(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
            DaemonError::Ipc("Daemon not running".to_string())
        }
        _ => DaemonError::Ipc(format!("Failed to connect: {}", e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_socket_is_owner_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("facekey.sock");

        let socket = AdminSocket::bind(&path).unwrap();
        let mode = std::fs::metadata(socket.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_stale_socket_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("facekey.sock");
        std::fs::write(&path, b"stale").unwrap();

        let socket = AdminSocket::bind(&path).unwrap();
        let accepted = tokio::spawn(async move { socket.accept().await.map(|_| ()) });
        connect(&path).await.unwrap();
        accepted.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connect_without_daemon() {
        let temp_dir = TempDir::new().unwrap();
        let missing = connect(&temp_dir.path().join("missing.sock"))
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "IPC error: Daemon not running");

        // Socket file left behind by a daemon that exited without cleanup
        let path = temp_dir.path().join("dead.sock");
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        let refused = connect(&path).await.unwrap_err();
        assert_eq!(refused.to_string(), "IPC error: Daemon not running");
    }
}
