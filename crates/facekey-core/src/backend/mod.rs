//! Face detection and encoding backends
//!
//! The capture loop and the registration endpoint only see the
//! [`FaceEncoder`] trait. The native dlib backend is behind the `dlib`
//! feature; tests use in-memory fakes.

use image::RgbImage;

use crate::encoding::FaceEncoding;
use crate::error::Result;

#[cfg(feature = "dlib")]
mod dlib;

#[cfg(feature = "dlib")]
pub use dlib::{DlibEncoder, DlibModelPaths};

/// Locates faces in an image and computes one encoding per face
pub trait FaceEncoder: Send + Sync {
    /// Encode every face found in the image; no faces yields an empty vec
    fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEncoding>>;

    /// Encode at most one face (the first detected)
    fn encode_first(&self, image: &RgbImage) -> Result<Option<FaceEncoding>> {
        Ok(self.encode(image)?.into_iter().next())
    }

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
