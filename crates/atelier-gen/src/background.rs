//! Near-white background keying
//!
//! A crude filter: every pixel whose red, green and blue channels all reach
//! the threshold becomes fully transparent. Only reliable when the source was
//! rendered on a plain white background.

use crate::asset::AssetContent;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Channel value (0-255) at or above which a pixel counts as background
pub const WHITE_THRESHOLD: u8 = 245;

/// Key out near-white pixels and re-encode as PNG.
///
/// Content that cannot be decoded (or re-encoded) is returned unchanged.
pub fn strip_white_background(content: &AssetContent) -> AssetContent {
    let decoded = match image::load_from_memory(&content.bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!(error = %e, mime = %content.mime_type, "background strip skipped: decode failed");
            return content.clone();
        }
    };

    let mut rgba = decoded.to_rgba8();
    let cleared = key_out_white(&mut rgba);
    tracing::debug!(
        cleared,
        total = rgba.width() as u64 * rgba.height() as u64,
        "keyed out background pixels"
    );

    let mut encoded = Vec::new();
    if let Err(e) = rgba.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png) {
        tracing::warn!(error = %e, "background strip skipped: encode failed");
        return content.clone();
    }

    AssetContent::new(encoded, "image/png")
}

/// Zero the alpha of every near-white pixel in place. Returns how many
/// pixels were cleared.
pub fn key_out_white(image: &mut RgbaImage) -> usize {
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if r >= WHITE_THRESHOLD && g >= WHITE_THRESHOLD && b >= WHITE_THRESHOLD {
            pixel.0[3] = 0;
            cleared += 1;
        }
    }
    cleared
}
