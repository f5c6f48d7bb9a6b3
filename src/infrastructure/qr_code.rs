//! QR code rendering.

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;

/// Minimum edge length of rendered images, in pixels.
pub const QR_MIN_DIMENSION: u32 = 400;

#[derive(Debug, thiserror::Error)]
pub enum QrRenderError {
    #[error("Failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Failed to write PNG: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders `text` as a PNG QR code with the highest error-correction level.
///
/// CPU bound; call it from a blocking context.
pub fn render_png(text: &str) -> Result<Vec<u8>, QrRenderError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(png)
}
