//! Frame and image helpers

use base64::Engine;
use image::{imageops, RgbImage};

use crate::error::Result;

/// Strip an optional `data:<mime>;base64,` prefix from an image payload
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// Decode a Base64 (optionally data-URI) image payload into an RGB image
pub fn decode_base64_image(payload: &str) -> Result<RgbImage> {
    let data = strip_data_uri(payload.trim());
    let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
    decode_image_bytes(&bytes)
}

/// Decode encoded image bytes (PNG, JPEG) into an RGB image
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

/// Scale a frame by `factor` to bound detection cost
///
/// Dimensions never drop below one pixel. A factor of 1.0 or more returns a
/// copy of the frame.
pub fn downscale(frame: &RgbImage, factor: f32) -> RgbImage {
    if factor >= 1.0 || factor <= 0.0 {
        return frame.clone();
    }

    let (width, height) = frame.dimensions();
    let new_width = ((width as f32 * factor).round() as u32).max(1);
    let new_height = ((height as f32 * factor).round() as u32).max(1);

    imageops::resize(frame, new_width, new_height, imageops::FilterType::Triangle)
}
