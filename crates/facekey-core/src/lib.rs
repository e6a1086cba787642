//! facekey Core - Shared types, motion scoring, and face matching
//!
//! This crate provides the platform-independent building blocks for the
//! facekey workstation unlock daemon: face encodings and the biometric
//! matcher, the motion gate that keeps face detection off static scenes,
//! frame decoding helpers, and the persisted credential/enrollment record.

pub mod backend;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod matcher;
pub mod motion;
pub mod record;
pub mod token;
pub mod types;

pub use backend::FaceEncoder;
pub use encoding::FaceEncoding;
pub use error::{Error, Result};
pub use matcher::FaceMatcher;
pub use motion::{MotionDetector, MotionParams};
pub use record::PersistedState;
pub use token::AuthToken;
pub use types::LockState;

/// Number of dimensions in a face encoding
pub const ENCODING_DIMENSIONS: usize = 128;

/// Default maximum distance for two encodings to count as the same person
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// Default motion score above which face detection runs
pub const DEFAULT_MOTION_THRESHOLD: u64 = 3000;

/// Default per-pixel delta that counts as changed
pub const DEFAULT_PIXEL_THRESHOLD: u8 = 25;

/// Gaussian sigma equivalent to a 21x21 kernel with automatic sigma
pub const DEFAULT_BLUR_SIGMA: f32 = 3.5;

/// Default scale applied to frames before face detection
pub const DEFAULT_DOWNSCALE: f32 = 0.25;
