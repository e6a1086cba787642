//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use facekey_core::{
    MotionParams, DEFAULT_BLUR_SIGMA, DEFAULT_DOWNSCALE, DEFAULT_MOTION_THRESHOLD,
    DEFAULT_PIXEL_THRESHOLD, DEFAULT_TOLERANCE,
};

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path of the persisted token/password/enrollment record
    pub state_path: PathBuf,

    /// Unix socket path for admin IPC
    pub ipc_socket_path: PathBuf,

    /// Host the pairing server binds to
    pub server_host: String,

    /// First port tried by the pairing server
    pub server_port: u16,

    /// Number of consecutive ports tried before giving up
    pub port_attempts: u16,

    /// Lock state poll interval (milliseconds)
    pub poll_interval_ms: u64,

    /// Whether to run the camera loop while locked
    pub face_unlock_enabled: bool,

    /// Camera device index
    pub camera_index: u32,

    /// Sleep between capture iterations (milliseconds)
    pub frame_interval_ms: u64,

    /// Backoff after the camera fails to open (seconds)
    pub camera_backoff_secs: u64,

    /// Pause after a successful face unlock (seconds)
    pub match_cooldown_secs: u64,

    /// Motion score above which face detection runs
    pub motion_threshold: u64,

    /// Per-pixel delta that counts as motion
    pub pixel_threshold: u8,

    /// Gaussian blur sigma applied before diffing
    pub blur_sigma: f32,

    /// Scale factor applied before face detection
    pub downscale: f32,

    /// Maximum encoding distance accepted as a match
    pub tolerance: f64,

    /// Directory containing face model files
    pub model_dir: PathBuf,

    /// Maximum accepted request body size (bytes)
    pub max_body_bytes: usize,

    /// Maximum images accepted per registration request
    pub max_register_images: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_path: Self::default_data_dir().join("state.json"),
            ipc_socket_path: Self::default_ipc_path(),
            server_host: "0.0.0.0".to_string(),
            server_port: 7717,
            port_attempts: 10,
            poll_interval_ms: 1000,
            face_unlock_enabled: true,
            camera_index: 0,
            frame_interval_ms: 100,
            camera_backoff_secs: 2,
            match_cooldown_secs: 5,
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
            blur_sigma: DEFAULT_BLUR_SIGMA,
            downscale: DEFAULT_DOWNSCALE,
            tolerance: DEFAULT_TOLERANCE,
            model_dir: Self::default_data_dir().join("models"),
            max_body_bytes: 16 * 1024 * 1024,
            max_register_images: 32,
        }
    }
}

impl DaemonConfig {
    /// Platform-appropriate default IPC path
    fn default_ipc_path() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, fallback to /tmp
        std::env::var_os("XDG_RUNTIME_DIR")
            .map(|dir| PathBuf::from(dir).join("facekey.sock"))
            .unwrap_or_else(|| PathBuf::from("/tmp/facekey.sock"))
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/var/lib"))
            .join("facekey")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn camera_backoff(&self) -> Duration {
        Duration::from_secs(self.camera_backoff_secs)
    }

    pub fn match_cooldown(&self) -> Duration {
        Duration::from_secs(self.match_cooldown_secs)
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            pixel_threshold: self.pixel_threshold,
            blur_sigma: self.blur_sigma,
        }
    }

    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the daemon misbehave
    pub fn validate(&self) -> crate::Result<()> {
        if self.port_attempts == 0 {
            return Err(crate::DaemonError::Config(
                "port_attempts must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(crate::DaemonError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(crate::DaemonError::Config(
                "tolerance must be a non-negative number".to_string(),
            ));
        }
        if !(self.downscale > 0.0 && self.downscale <= 1.0) {
            return Err(crate::DaemonError::Config(
                "downscale must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Create directories if they don't exist
    pub fn ensure_directories(&self) -> crate::Result<()> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Some(parent) = self.ipc_socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Helper module for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
    }
}
