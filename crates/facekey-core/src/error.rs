//! Error types for the facekey core library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Encoding length mismatch: expected {expected}, got {actual}")]
    EncodingLength { expected: usize, actual: usize },

    #[error("Face backend error: {0}")]
    Backend(String),

    #[error("Model file missing: {0}")]
    ModelMissing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::ImageDecode(e.to_string())
    }
}
