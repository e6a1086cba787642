//! Persisted credential and enrollment record
//!
//! The whole durable state of the daemon is one JSON object:
//!
//! ```json
//! { "authToken": "…", "password": null, "faceEncodings": [[…128 floats…]] }
//! ```
//!
//! Reads tolerate missing fields and the older snake_case key names.

use serde::{Deserialize, Serialize};

use crate::encoding::FaceEncoding;
use crate::error::Result;

/// Credential state plus the enrollment set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    /// Bearer token for the pairing server (hex, 128-bit)
    #[serde(alias = "auth_token")]
    pub auth_token: Option<String>,

    /// Stored unlock credential; unlock is disabled when absent
    pub password: Option<String>,

    /// Enrolled face encodings, append-only
    #[serde(alias = "face_encodings")]
    pub face_encodings: Vec<FaceEncoding>,
}

impl PersistedState {
    /// Parse a persisted record
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize the full record
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}
