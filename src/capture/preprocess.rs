//! Frame enhancement before analysis.
//!
//! Workbook pages read better after grayscale conversion with a mild
//! contrast and brightness boost.

use super::CaptureError;
use crate::agent::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage};

const CONTRAST: f32 = 1.4;
const BRIGHTNESS: f32 = 1.1;
const JPEG_QUALITY: u8 = 95;

/// Grayscale, apply contrast then brightness, and re-encode as JPEG.
pub fn enhance(frame: &Frame) -> Result<Frame, CaptureError> {
    let image = image::load_from_memory(&frame.bytes)?;
    let mut gray: GrayImage = image.to_luma8();

    for pixel in gray.pixels_mut() {
        pixel.0[0] = adjust(pixel.0[0]);
    }

    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY))?;

    Ok(Frame::jpeg(bytes))
}

/// [`enhance`], or the frame unchanged if it cannot be decoded.
pub fn enhance_or_raw(frame: Frame) -> Frame {
    match enhance(&frame) {
        Ok(enhanced) => enhanced,
        Err(e) => {
            tracing::warn!(error = %e, "Preprocessing failed, analysing raw frame");
            frame
        }
    }
}

/// Linear contrast around mid-gray followed by a brightness multiplier.
fn adjust(value: u8) -> u8 {
    let v = value as f32 / 255.0;
    let contrasted = (v - 0.5) * CONTRAST + 0.5;
    let brightened = contrasted.clamp(0.0, 1.0) * BRIGHTNESS;
    (brightened.clamp(0.0, 1.0) * 255.0).round() as u8
}
