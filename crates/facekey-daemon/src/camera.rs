//! Camera frame sources
//!
//! A [`CameraFactory`] is shared across threads and opens a [`FrameSource`]
//! inside the capture thread; the source itself never crosses threads, since
//! most native camera handles are not `Send`.

use image::RgbImage;

use crate::error::{DaemonError, Result};

/// An open camera stream
pub trait FrameSource {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<RgbImage>;
}

/// Opens camera streams on demand
pub trait CameraFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>>;
}

/// Factory for builds without camera support; opening always fails
pub struct NoCamera;

impl CameraFactory for NoCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>> {
        Err(DaemonError::CameraUnavailable(
            "built without camera support".to_string(),
        ))
    }
}

#[cfg(feature = "camera")]
pub use native::NokhwaCamera;

#[cfg(feature = "camera")]
mod native {
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use nokhwa::Camera;

    use super::{CameraFactory, FrameSource};
    use crate::error::{DaemonError, Result};

    /// Webcam opened through nokhwa
    pub struct NokhwaCamera {
        index: u32,
    }

    impl NokhwaCamera {
        pub fn new(index: u32) -> Self {
            Self { index }
        }
    }

    impl CameraFactory for NokhwaCamera {
        fn open(&self) -> Result<Box<dyn FrameSource>> {
            let format =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = Camera::new(CameraIndex::Index(self.index), format)
                .map_err(|e| DaemonError::CameraUnavailable(e.to_string()))?;
            camera
                .open_stream()
                .map_err(|e| DaemonError::CameraUnavailable(e.to_string()))?;
            Ok(Box::new(NokhwaSource { camera }))
        }
    }

    struct NokhwaSource {
        camera: Camera,
    }

    impl FrameSource for NokhwaSource {
        fn read_frame(&mut self) -> Result<RgbImage> {
            let buffer = self
                .camera
                .frame()
                .map_err(|e| DaemonError::FrameAcquisition(e.to_string()))?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(|e| DaemonError::FrameAcquisition(e.to_string()))?;

            let (width, height) = (decoded.width(), decoded.height());
            RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
                DaemonError::FrameAcquisition("frame buffer size mismatch".to_string())
            })
        }
    }

    impl Drop for NokhwaSource {
        fn drop(&mut self) {
            let _ = self.camera.stop_stream();
        }
    }
}

/// Camera factory for this build
pub fn platform_camera(index: u32) -> std::sync::Arc<dyn CameraFactory> {
    #[cfg(feature = "camera")]
    return std::sync::Arc::new(NokhwaCamera::new(index));

    #[cfg(not(feature = "camera"))]
    {
        let _ = index;
        std::sync::Arc::new(NoCamera)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_camera_is_unavailable() {
        assert!(matches!(
            NoCamera.open(),
            Err(DaemonError::CameraUnavailable(_))
        ));
    }
}
