//! Client for communicating with the facekey daemon

use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use zeroize::Zeroize;

use facekey_daemon::ipc::{self, IpcRequest, IpcResponse};

/// Client for the facekey daemon
///
/// Each command opens its own connection and sends a single request line.
pub struct FacekeyClient {
    socket_path: PathBuf,
}

/// Error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unlock failed: {0}")]
    UnlockFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Daemon error: {0}")]
    DaemonError(String),
}

impl ClientError {
    fn from_daemon_error(e: facekey_daemon::DaemonError) -> Self {
        match &e {
            facekey_daemon::DaemonError::Ipc(msg) if msg.contains("not running") => {
                ClientError::DaemonNotRunning
            }
            _ => ClientError::DaemonError(e.to_string()),
        }
    }

    fn unexpected() -> Self {
        ClientError::RequestFailed("Unexpected response".to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Daemon status summary
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonStatus {
    pub server_addr: Option<String>,
    pub lan_ip: Option<String>,
    pub enrolled_faces: usize,
    pub password_set: bool,
    pub face_unlock: bool,
    pub capture_running: bool,
}

impl FacekeyClient {
    /// Create a new client with the default socket path
    pub fn new() -> Self {
        let socket_path = std::env::var_os("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join("facekey.sock"))
            .unwrap_or_else(|| PathBuf::from("/tmp/facekey.sock"));

        Self::with_socket_path(socket_path)
    }

    /// Create a new client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// One request line out, one response line back
    ///
    /// Both lines can carry the unlock password, so the buffers are wiped
    /// once parsed.
    async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let stream = ipc::connect(&self.socket_path)
            .await
            .map_err(ClientError::from_daemon_error)?;
        let (reader, mut writer) = stream.into_split();

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        let sent = writer.write_all(line.as_bytes()).await;
        line.zeroize();
        sent?;

        let mut reply = String::new();
        let read = BufReader::new(reader).read_line(&mut reply).await;
        if read? == 0 {
            return Err(ClientError::RequestFailed(
                "Daemon closed the connection".to_string(),
            ));
        }

        let response = serde_json::from_str(&reply);
        reply.zeroize();
        Ok(response?)
    }

    /// Check if the daemon is running
    pub async fn ping(&self) -> Result<String> {
        match self.request(&IpcRequest::Ping).await? {
            IpcResponse::Pong { version } => Ok(version),
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }

    /// Get the daemon status
    pub async fn status(&self) -> Result<DaemonStatus> {
        match self.request(&IpcRequest::GetStatus).await? {
            IpcResponse::Status {
                server_addr,
                lan_ip,
                enrolled_faces,
                password_set,
                face_unlock,
                capture_running,
            } => Ok(DaemonStatus {
                server_addr,
                lan_ip,
                enrolled_faces,
                password_set,
                face_unlock,
                capture_running,
            }),
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }

    /// Store (or clear, when empty) the unlock password
    pub async fn set_password(&self, password: String) -> Result<()> {
        match self.request(&IpcRequest::SetPassword { password }).await? {
            IpcResponse::Ok => Ok(()),
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }

    /// Read back the stored password
    pub async fn show_password(&self) -> Result<Option<String>> {
        match self.request(&IpcRequest::ShowPassword).await? {
            IpcResponse::Password { password } => Ok(password),
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }

    /// Ask the daemon to type the stored password now
    pub async fn test_unlock(&self) -> Result<()> {
        match self.request(&IpcRequest::TestUnlock).await? {
            IpcResponse::Ok => Ok(()),
            IpcResponse::Error { message } => Err(ClientError::UnlockFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }

    /// Pairing page URL for a phone on the LAN
    pub async fn pairing_url(&self) -> Result<String> {
        match self.request(&IpcRequest::GetPairingUrl).await? {
            IpcResponse::PairingUrl { url } => Ok(url),
            IpcResponse::Error { message } => Err(ClientError::RequestFailed(message)),
            _ => Err(ClientError::unexpected()),
        }
    }
}

impl Default for FacekeyClient {
    fn default() -> Self {
        Self::new()
    }
}
