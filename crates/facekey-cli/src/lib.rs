//! facekey CLI - Admin client for the facekey daemon
//!
//! Talks to the daemon over its local IPC socket to manage the stored unlock
//! password, run a test unlock, and print the phone pairing URL.

pub mod client;
pub mod commands;

pub use client::FacekeyClient;
pub use commands::*;
