#![no_main]

use arbitrary::Arbitrary;
use facekey_core::{MotionDetector, MotionParams};
use image::RgbImage;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Frames {
    width: u8,
    height: u8,
    pixel_threshold: u8,
    first: Vec<u8>,
    second: Vec<u8>,
}

fn frame(width: u32, height: u32, bytes: &[u8]) -> RgbImage {
    let len = (width * height * 3) as usize;
    let mut raw = bytes.to_vec();
    raw.resize(len, 0);
    RgbImage::from_raw(width, height, raw).expect("buffer sized to dimensions")
}

fuzz_target!(|input: Frames| {
    let width = u32::from(input.width.max(1));
    let height = u32::from(input.height.max(1));

    let mut detector = MotionDetector::new(MotionParams {
        pixel_threshold: input.pixel_threshold,
        blur_sigma: 0.0,
    });
    assert_eq!(detector.score(&frame(width, height, &input.first)), None);

    let score = detector
        .score(&frame(width, height, &input.second))
        .expect("same dimensions give a score");
    assert_eq!(score % 255, 0);
    assert!(score <= u64::from(width * height) * 255);
});
