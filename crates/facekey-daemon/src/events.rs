//! Collaborator-facing daemon events
//!
//! Everything a status icon or notification layer might show is published
//! here. Delivery is fire-and-forget: a send with no subscribers is not an
//! error.

use std::net::{IpAddr, SocketAddr};
use tokio::sync::broadcast;

/// Event emitted by the daemon core
#[derive(Debug, Clone, PartialEq)]
pub enum DaemonEvent {
    /// Pairing server is listening
    ServerBound { addr: SocketAddr, lan_ip: IpAddr },
    /// Pairing server could not start
    ServerFailed { reason: String },
    /// Session became locked
    Locked,
    /// Session became unlocked
    Unlocked,
    /// Camera loop started
    CaptureStarted,
    /// Camera loop exited
    CaptureStopped,
    /// A captured face matched an enrolled one
    MatchSucceeded,
    /// A face was seen but matched nobody
    MatchFailed,
    /// The stored credential was typed into the login prompt
    UnlockPerformed,
    /// Unlock was attempted and failed
    UnlockFailed { reason: String },
    /// Unlock refused because no password is stored
    CredentialMissing,
    /// New face encodings were enrolled
    Enrolled { added: usize, total: usize },
}

/// Broadcast hub for [`DaemonEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DaemonEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribe to daemon events
    pub fn subscribe(&self) -> broadcast::Receiver<DaemonEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, ignoring the absence of subscribers
    pub fn publish(&self, event: DaemonEvent) {
        let _ = self.tx.send(event);
    }
}
