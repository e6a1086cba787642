//! Local admin IPC
//!
//! Lets the CLI (or a status-bar frontend) set and read the unlock password,
//! trigger a test unlock, and query the pairing URL over a Unix domain socket
//! that only the owning user can open.
//!
//! The wire format is one JSON `IpcRequest` per line, answered by one JSON
//! `IpcResponse` per line, on a connection that stays open for more requests.

mod server;
mod socket;
mod types;

// Public API
pub use server::{IpcContext, IpcServer};
pub use socket::{connect, AdminSocket};
pub use types::{IpcRequest, IpcResponse};
