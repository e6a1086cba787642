//! Motion gate
//!
//! Face detection is orders of magnitude more expensive than a frame diff, so
//! the capture loop only runs it when consecutive frames differ enough. Each
//! frame is converted to grayscale and blurred to suppress sensor noise, then
//! diffed against the previous blurred frame. Pixels whose delta exceeds the
//! pixel threshold contribute 255 to the score, the rest contribute nothing.

use image::{imageops, GrayImage, RgbImage};

use crate::{DEFAULT_BLUR_SIGMA, DEFAULT_PIXEL_THRESHOLD};

/// Tunables for motion scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Per-pixel absolute delta above which a pixel counts as changed
    pub pixel_threshold: u8,
    /// Gaussian blur sigma; zero disables blurring
    pub blur_sigma: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }
}

/// Rolling frame differ holding the previous blurred grayscale frame
#[derive(Debug, Default)]
pub struct MotionDetector {
    params: MotionParams,
    previous: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new(params: MotionParams) -> Self {
        Self {
            params,
            previous: None,
        }
    }

    /// Score the frame against the previous one and keep it as the new baseline
    ///
    /// Returns `None` when there is no comparable previous frame (first frame,
    /// or the resolution changed).
    pub fn score(&mut self, frame: &RgbImage) -> Option<u64> {
        let current = prepare_frame(frame, self.params.blur_sigma);

        let score = match &self.previous {
            Some(prev) if prev.dimensions() == current.dimensions() => {
                Some(motion_score(prev, &current, self.params.pixel_threshold))
            }
            _ => None,
        };

        self.previous = Some(current);
        score
    }

    /// Forget the baseline frame
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

/// Grayscale + Gaussian blur
pub fn prepare_frame(frame: &RgbImage, blur_sigma: f32) -> GrayImage {
    let gray = imageops::grayscale(frame);
    if blur_sigma > 0.0 {
        imageops::blur(&gray, blur_sigma)
    } else {
        gray
    }
}

/// Sum of the thresholded absolute difference mask
///
/// Both frames must have identical dimensions.
pub fn motion_score(previous: &GrayImage, current: &GrayImage, pixel_threshold: u8) -> u64 {
    previous
        .as_raw()
        .iter()
        .zip(current.as_raw().iter())
        .filter(|(a, b)| a.abs_diff(**b) > pixel_threshold)
        .count() as u64
        * 255
}
