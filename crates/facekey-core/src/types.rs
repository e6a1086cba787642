//! Core enums shared between the daemon components

use serde::{Deserialize, Serialize};

/// Sampled OS session lock state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    Locked,
    #[default]
    Unlocked,
}

impl LockState {
    pub fn from_locked(locked: bool) -> Self {
        if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }
}
