//! dlib HOG detector + ResNet face encoder

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dlib_face_recognition::{
    FaceDetector, FaceDetectorTrait, FaceEncoderNetwork, FaceEncoderTrait, ImageMatrix,
    LandmarkPredictor, LandmarkPredictorTrait,
};
use image::RgbImage;

use super::FaceEncoder;
use crate::encoding::FaceEncoding;
use crate::error::{Error, Result};

const LANDMARKS_FILE: &str = "shape_predictor_68_face_landmarks.dat";
const ENCODER_FILE: &str = "dlib_face_recognition_resnet_model_v1.dat";

/// Locations of the dlib model files
#[derive(Debug, Clone)]
pub struct DlibModelPaths {
    pub landmarks: PathBuf,
    pub encoder: PathBuf,
}

impl DlibModelPaths {
    /// Standard file names inside a model directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            landmarks: dir.join(LANDMARKS_FILE),
            encoder: dir.join(ENCODER_FILE),
        }
    }

    fn ensure_present(&self) -> Result<()> {
        for path in [&self.landmarks, &self.encoder] {
            if !path.exists() {
                return Err(Error::ModelMissing(path.display().to_string()));
            }
        }
        Ok(())
    }
}

struct DlibModels {
    detector: FaceDetector,
    landmarks: LandmarkPredictor,
    encoder: FaceEncoderNetwork,
}

// SAFETY: the dlib handles are only ever touched while holding the mutex in
// `DlibEncoder`, so they are never used from two threads at once.
unsafe impl Send for DlibModels {}

/// dlib-backed [`FaceEncoder`]
pub struct DlibEncoder {
    models: Mutex<DlibModels>,
}

impl DlibEncoder {
    /// Load the detector and model files; missing files are fatal
    pub fn load(paths: &DlibModelPaths) -> Result<Self> {
        paths.ensure_present()?;

        let landmarks = LandmarkPredictor::open(&paths.landmarks).map_err(Error::Backend)?;
        let encoder = FaceEncoderNetwork::open(&paths.encoder).map_err(Error::Backend)?;

        Ok(Self {
            models: Mutex::new(DlibModels {
                detector: FaceDetector::new(),
                landmarks,
                encoder,
            }),
        })
    }
}

impl FaceEncoder for DlibEncoder {
    fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEncoding>> {
        let (width, height) = image.dimensions();
        // SAFETY: the buffer is a packed RGB8 image of exactly width*height*3
        // bytes and outlives the matrix, which copies it on construction.
        let matrix =
            unsafe { ImageMatrix::new(width as usize, height as usize, image.as_raw().as_ptr()) };

        let models = self
            .models
            .lock()
            .map_err(|_| Error::Backend("dlib model lock poisoned".to_string()))?;

        let locations = models.detector.face_locations(&matrix);
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let landmarks: Vec<_> = locations
            .iter()
            .map(|rect| models.landmarks.face_landmarks(&matrix, rect))
            .collect();

        let encodings = models.encoder.get_face_encodings(&matrix, &landmarks, 0);

        Ok(encodings
            .iter()
            .map(|e| FaceEncoding::new(e.as_ref().to_vec()))
            .collect())
    }

    fn name(&self) -> &'static str {
        "dlib"
    }
}
