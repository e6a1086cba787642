//! Error types for the facekey daemon

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Errors that can occur in the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] facekey_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted state could not be read or written
    #[error("Config store IO error: {0}")]
    ConfigIo(String),

    /// Camera could not be opened
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Camera opened but a frame could not be read
    #[error("Frame acquisition failed: {0}")]
    FrameAcquisition(String),

    /// Presented token did not match
    #[error("Authentication failed")]
    Auth,

    /// Request body could not be understood
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Pairing server could not bind
    #[error("Failed to bind port {port}: {kind}")]
    PortBind { port: u16, kind: ErrorKind },

    /// Every port in the configured range was in use
    #[error("Ports {first} to {last} are all in use")]
    PortsExhausted { first: u16, last: u16 },

    /// No unlock credential stored
    #[error("No unlock password is stored")]
    CredentialMissing,

    /// OS automation channel failed
    #[error("Credential injection failed: {0}")]
    AutomationInjection(String),

    /// Another unlock is still typing
    #[error("An unlock is already in progress")]
    UnlockInProgress,

    /// Face backend failure
    #[error("Face encoder error: {0}")]
    Encoder(String),

    /// Lock state query failure
    #[error("Lock state query failed: {0}")]
    LockQuery(String),

    /// IPC error
    #[error("IPC error: {0}")]
    Ipc(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for DaemonError {
    fn from(e: serde_json::Error) -> Self {
        DaemonError::Serialization(e.to_string())
    }
}
