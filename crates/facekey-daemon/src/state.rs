//! Credential and enrollment store
//!
//! Owns the single durable record (token, password, enrolled encodings). The
//! in-memory copy sits behind one mutex; every accessor holds it only for the
//! read or the mutate-and-persist step, never across camera or network work.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use facekey_core::{AuthToken, FaceEncoding, PersistedState};

use crate::error::{DaemonError, Result};

/// Shared, persisted daemon state
pub struct StateStore {
    /// Location of the JSON record
    path: PathBuf,

    /// In-memory record
    inner: Mutex<PersistedState>,
}

impl StateStore {
    /// Load the record (best effort) and make sure a token exists
    ///
    /// A missing or unreadable file starts from empty state. When no token is
    /// present a fresh one is generated and saved immediately.
    pub fn open(path: PathBuf) -> Self {
        let mut state = load_record(&path);

        if state.auth_token.as_deref().map_or(true, str::is_empty) {
            state.auth_token = Some(AuthToken::generate().as_str().to_string());
            match write_record(&path, &state) {
                Ok(()) => info!("Generated new pairing token"),
                Err(e) => warn!("Failed to persist new pairing token: {}", e),
            }
        }

        info!(
            "Loaded {} enrolled face encoding(s)",
            state.face_encodings.len()
        );

        Self {
            path,
            inner: Mutex::new(state),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current pairing token
    pub fn auth_token(&self) -> AuthToken {
        let state = self.inner.lock();
        AuthToken::from_string(state.auth_token.clone().unwrap_or_default())
    }

    /// Exact-match check of a presented bearer token
    pub fn verify_token(&self, presented: &str) -> bool {
        self.auth_token().matches(presented)
    }

    /// Stored unlock credential, if any
    pub fn password(&self) -> Option<String> {
        let state = self.inner.lock();
        state.password.clone().filter(|p| !p.is_empty())
    }

    pub fn has_password(&self) -> bool {
        self.inner.lock().has_password()
    }

    /// Replace (or clear) the stored credential and persist
    pub fn set_password(&self, password: Option<String>) -> Result<()> {
        let mut state = self.inner.lock();

        let mut next = state.clone();
        next.password = password.filter(|p| !p.is_empty());
        write_record(&self.path, &next)?;

        if let Some(mut old) = std::mem::replace(&mut *state, next).password {
            old.zeroize();
        }
        info!("Unlock password updated");
        Ok(())
    }

    /// Snapshot of the enrollment set
    pub fn enrollments(&self) -> Vec<FaceEncoding> {
        self.inner.lock().face_encodings.clone()
    }

    pub fn enrollment_count(&self) -> usize {
        self.inner.lock().face_encodings.len()
    }

    /// Append encodings and persist; returns the new enrollment count
    ///
    /// Nothing changes in memory if the write fails.
    pub fn append_encodings(&self, encodings: Vec<FaceEncoding>) -> Result<usize> {
        let mut state = self.inner.lock();

        let mut next = state.clone();
        next.face_encodings.extend(encodings);
        write_record(&self.path, &next)?;

        *state = next;
        Ok(state.face_encodings.len())
    }

    /// Copy of the full record
    pub fn snapshot(&self) -> PersistedState {
        self.inner.lock().clone()
    }

    /// Write the current record to disk
    pub fn save(&self) -> Result<()> {
        let state = self.inner.lock();
        write_record(&self.path, &state)
    }
}

/// Read the record, treating any failure as empty state
fn load_record(path: &Path) -> PersistedState {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No state file at {:?}, starting fresh", path);
            return PersistedState::default();
        }
        Err(e) => {
            warn!("Failed to read state file {:?}: {}", path, e);
            return PersistedState::default();
        }
    };

    match PersistedState::from_json(&content) {
        Ok(state) => state,
        Err(e) => {
            warn!("Failed to parse state file {:?}: {}", path, e);
            PersistedState::default()
        }
    }
}

/// Full-record overwrite via temp file + rename
fn write_record(path: &Path, state: &PersistedState) -> Result<()> {
    let content = state
        .to_json()
        .map_err(|e| DaemonError::ConfigIo(e.to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DaemonError::ConfigIo(e.to_string()))?;
    }

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, &content).map_err(|e| DaemonError::ConfigIo(e.to_string()))?;

    // The record holds a plaintext credential
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| DaemonError::ConfigIo(e.to_string()))?;
    }

    std::fs::rename(&temp_path, path).map_err(|e| DaemonError::ConfigIo(e.to_string()))?;
    Ok(())
}
