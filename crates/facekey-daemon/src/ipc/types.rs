//! IPC protocol types
//!
//! Newline-delimited JSON, tagged by `type`.

use serde::{Deserialize, Serialize};

/// IPC request types
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcRequest {
    /// Check if daemon is running
    Ping,

    /// Server address, enrollment and capture status
    GetStatus,

    /// Replace the stored unlock password; empty clears it
    SetPassword { password: String },

    /// Read back the stored unlock password
    ShowPassword,

    /// Run the unlock executor now
    TestUnlock,

    /// Pairing page URL including the token
    GetPairingUrl,
}

impl IpcRequest {
    /// Request name for logs; never includes payloads
    pub fn kind(&self) -> &'static str {
        match self {
            IpcRequest::Ping => "Ping",
            IpcRequest::GetStatus => "GetStatus",
            IpcRequest::SetPassword { .. } => "SetPassword",
            IpcRequest::ShowPassword => "ShowPassword",
            IpcRequest::TestUnlock => "TestUnlock",
            IpcRequest::GetPairingUrl => "GetPairingUrl",
        }
    }
}

impl std::fmt::Debug for IpcRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// IPC response types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcResponse {
    /// Success with no data
    Ok,

    /// Pong response
    Pong { version: String },

    /// Error response
    Error { message: String },

    /// Daemon status
    Status {
        server_addr: Option<String>,
        lan_ip: Option<String>,
        enrolled_faces: usize,
        password_set: bool,
        face_unlock: bool,
        capture_running: bool,
    },

    /// Stored password, if any
    Password { password: Option<String> },

    /// Pairing page URL
    PairingUrl { url: String },
}
