//! facekey Daemon - Face and phone unlock for a locked workstation session
//!
//! This crate provides:
//! - Session lock polling that gates the camera pipeline
//! - A motion-gated capture loop that matches faces against enrollments
//! - The unlock executor that types the stored password into the login prompt
//! - An HTTP pairing server for enrollment and remote unlock from a phone
//! - IPC server for CLI communication

pub mod backend;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
#[cfg(unix)]
pub mod ipc;
pub mod lock_monitor;
pub mod server;
pub mod state;
pub mod status;
pub mod unlock;

pub use capture::{CaptureControl, CaptureLoop, CaptureOutcome, CaptureSettings};
pub use config::DaemonConfig;
pub use error::{DaemonError, Result};
pub use events::{DaemonEvent, EventBus};
#[cfg(unix)]
pub use ipc::IpcServer;
pub use lock_monitor::{LockMonitor, LockStateProbe, SystemLockProbe};
pub use server::{AppState, PairingServer};
pub use state::StateStore;
pub use status::{DaemonStatus, ServerInfo};
pub use unlock::{CredentialInjector, UnlockExecutor};
