//! IPC server implementation

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::capture::CaptureControl;
use crate::error::Result;
use crate::state::StateStore;
use crate::status::DaemonStatus;
use crate::unlock::UnlockExecutor;

use super::socket::AdminSocket;
use super::types::{IpcRequest, IpcResponse};

/// Daemon handles the admin requests operate on
#[derive(Clone)]
pub struct IpcContext {
    pub state: Arc<StateStore>,
    pub unlocker: Arc<UnlockExecutor>,
    pub status: Arc<DaemonStatus>,
    pub capture: Arc<CaptureControl>,
    pub face_unlock: bool,
}

/// IPC server
pub struct IpcServer {
    /// Socket path
    socket_path: PathBuf,

    /// Shared daemon handles
    context: IpcContext,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(socket_path: PathBuf, context: IpcContext) -> Self {
        Self {
            socket_path,
            context,
        }
    }

    /// Bind the socket and serve connections until the task is dropped
    pub async fn run(&self) -> Result<()> {
        let socket = AdminSocket::bind(&self.socket_path)?;

        info!("IPC server listening on {:?}", socket.path());

        loop {
            match socket.accept().await {
                Ok(stream) => {
                    let context = self.context.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, context).await {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single IPC connection
async fn handle_connection<S>(stream: S, context: IpcContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let request: IpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let response = IpcResponse::Error {
                    message: format!("Invalid request: {}", e),
                };
                send_response(&mut writer, &response).await?;
                line.clear();
                continue;
            }
        };

        debug!("Received IPC request: {:?}", request);

        let response = handle_request(request, &context).await;

        send_response(&mut writer, &response).await?;
        line.clear();
    }

    Ok(())
}

/// Handle a single request
async fn handle_request(request: IpcRequest, context: &IpcContext) -> IpcResponse {
    match request {
        IpcRequest::Ping => IpcResponse::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },

        IpcRequest::GetStatus => {
            let server = context.status.server();
            IpcResponse::Status {
                server_addr: server.map(|s| s.addr.to_string()),
                lan_ip: server.map(|s| s.lan_ip.to_string()),
                enrolled_faces: context.state.enrollment_count(),
                password_set: context.state.has_password(),
                face_unlock: context.face_unlock,
                capture_running: context.capture.is_running(),
            }
        }

        IpcRequest::SetPassword { password } => {
            let state = Arc::clone(&context.state);
            let value = Some(password).filter(|p| !p.is_empty());
            match tokio::task::spawn_blocking(move || state.set_password(value)).await {
                Ok(Ok(())) => IpcResponse::Ok,
                Ok(Err(e)) => IpcResponse::Error {
                    message: format!("Failed to save password: {}", e),
                },
                Err(e) => IpcResponse::Error {
                    message: format!("Task failed: {}", e),
                },
            }
        }

        IpcRequest::ShowPassword => IpcResponse::Password {
            password: context.state.password(),
        },

        IpcRequest::TestUnlock => {
            info!("Manual unlock test requested");
            let unlocker = Arc::clone(&context.unlocker);
            match tokio::task::spawn_blocking(move || unlocker.unlock()).await {
                Ok(Ok(())) => IpcResponse::Ok,
                Ok(Err(e)) => {
                    warn!("Manual unlock test failed: {}", e);
                    IpcResponse::Error {
                        message: e.to_string(),
                    }
                }
                Err(e) => IpcResponse::Error {
                    message: format!("Task failed: {}", e),
                },
            }
        }

        IpcRequest::GetPairingUrl => match context.status.server() {
            Some(server) => IpcResponse::PairingUrl {
                url: server.pairing_url(context.state.auth_token().as_str()),
            },
            None => IpcResponse::Error {
                message: "Pairing server is not running".to_string(),
            },
        },
    }
}

/// Send a response
async fn send_response<W>(writer: &mut W, response: &IpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::status::ServerInfo;
    use crate::unlock::testing::RecordingInjector;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tempfile::TempDir;

    fn context() -> (TempDir, IpcContext, RecordingInjector) {
        let temp_dir = TempDir::new().unwrap();
        let state = Arc::new(StateStore::open(temp_dir.path().join("state.json")));
        let injector = RecordingInjector::default();
        let unlocker = Arc::new(UnlockExecutor::new(
            Arc::clone(&state),
            Box::new(injector.clone()),
            EventBus::new(),
        ));
        let context = IpcContext {
            state,
            unlocker,
            status: Arc::new(DaemonStatus::new()),
            capture: Arc::new(CaptureControl::new()),
            face_unlock: true,
        };
        (temp_dir, context, injector)
    }

    #[tokio::test]
    async fn test_ping() {
        let (_dir, context, _) = context();
        assert!(matches!(
            handle_request(IpcRequest::Ping, &context).await,
            IpcResponse::Pong { .. }
        ));
    }

    #[tokio::test]
    async fn test_set_show_and_clear_password() {
        let (_dir, context, _) = context();

        let set = IpcRequest::SetPassword {
            password: "pw".to_string(),
        };
        assert_eq!(handle_request(set, &context).await, IpcResponse::Ok);
        assert_eq!(
            handle_request(IpcRequest::ShowPassword, &context).await,
            IpcResponse::Password {
                password: Some("pw".to_string())
            }
        );

        let clear = IpcRequest::SetPassword {
            password: String::new(),
        };
        handle_request(clear, &context).await;
        assert_eq!(
            handle_request(IpcRequest::ShowPassword, &context).await,
            IpcResponse::Password { password: None }
        );
    }

    #[tokio::test]
    async fn test_unlock_requires_password() {
        let (_dir, context, injector) = context();

        assert!(matches!(
            handle_request(IpcRequest::TestUnlock, &context).await,
            IpcResponse::Error { .. }
        ));

        context.state.set_password(Some("pw".to_string())).unwrap();
        assert_eq!(
            handle_request(IpcRequest::TestUnlock, &context).await,
            IpcResponse::Ok
        );
        assert_eq!(injector.count(), 1);
    }

    #[tokio::test]
    async fn test_status_and_pairing_url() {
        let (_dir, context, _) = context();

        assert!(matches!(
            handle_request(IpcRequest::GetPairingUrl, &context).await,
            IpcResponse::Error { .. }
        ));

        context.status.set_server(ServerInfo {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 7718)),
            lan_ip: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
        });

        let token = context.state.auth_token();
        assert_eq!(
            handle_request(IpcRequest::GetPairingUrl, &context).await,
            IpcResponse::PairingUrl {
                url: format!("http://10.0.0.5:7718/?token={}", token.as_str())
            }
        );

        match handle_request(IpcRequest::GetStatus, &context).await {
            IpcResponse::Status {
                server_addr,
                lan_ip,
                enrolled_faces,
                password_set,
                capture_running,
                ..
            } => {
                assert_eq!(server_addr.as_deref(), Some("0.0.0.0:7718"));
                assert_eq!(lan_ip.as_deref(), Some("10.0.0.5"));
                assert_eq!(enrolled_faces, 0);
                assert!(!password_set);
                assert!(!capture_running);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_line_keeps_connection_open() {
        let (_dir, context, _) = context();
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(handle_connection(server, context));

        let (reader, mut writer) = tokio::io::split(client);
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        writer.write_all(b"{garbage\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        let response: IpcResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(response, IpcResponse::Error { .. }));

        line.clear();
        writer.write_all(b"{\"type\":\"Ping\"}\n").await.unwrap();
        reader.read_line(&mut line).await.unwrap();
        let response: IpcResponse = serde_json::from_str(&line).unwrap();
        assert!(matches!(response, IpcResponse::Pong { .. }));

        drop(writer);
        drop(reader);
        task.await.unwrap().unwrap();
    }
}
