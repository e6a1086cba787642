#![no_main]

use facekey_core::frame::{decode_base64_image, downscale};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|payload: &str| {
    // Untrusted registration image - decoding must fail cleanly, never panic
    if let Ok(image) = decode_base64_image(payload) {
        let small = downscale(&image, 0.25);
        assert!(small.width() >= 1 && small.height() >= 1);
    }
});
