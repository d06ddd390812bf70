//! Saving read-back frames to image files.

use image::{ImageBuffer, Rgba};
use std::path::Path;

/// Options for saving a frame.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptions {
    /// Keep the alpha channel (PNG only). When false, alpha is forced to 255.
    pub transparent_background: bool,
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let mut rgba = data.to_vec();
    if !options.transparent_background {
        for pixel in rgba.chunks_exact_mut(4) {
            pixel[3] = u8::MAX;
        }
    }
    // wgpu read-back is top-left origin, no vertical flip needed
    ImageBuffer::from_raw(width, height, rgba).ok_or(ScreenshotError::InvalidImageData)
}

/// Saves tightly packed RGBA pixels to `path` (`.png`, `.jpg` or `.jpeg`).
///
/// # Errors
/// Returns an error if the file cannot be written or the format is
/// unsupported.
pub fn save_image(
    path: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height, options)?;
    match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png)?,
        "jpg" | "jpeg" => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => return Err(ScreenshotError::UnsupportedFormat(extension)),
    }
    log::info!("saved {width}x{height} frame to {}", path.display());
    Ok(())
}

/// Encodes tightly packed RGBA pixels as PNG in memory.
///
/// # Errors
/// Returns an error if `data` does not match the size or encoding fails.
pub fn save_to_buffer(
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(data, width, height, options)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_options_default() {
        let opts = ScreenshotOptions::default();
        assert!(!opts.transparent_background);
    }

    #[test]
    fn test_png_buffer_round_trips_pixels() {
        let data = [255, 0, 0, 10, 0, 255, 0, 20];
        let png = save_to_buffer(&data, 2, 1, &ScreenshotOptions::default()).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0, 255]);

        let keep_alpha = ScreenshotOptions {
            transparent_background: true,
        };
        let png = save_to_buffer(&data, 2, 1, &keep_alpha).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0).0[3], 20);
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(matches!(
            save_to_buffer(&[0; 7], 2, 1, &ScreenshotOptions::default()),
            Err(ScreenshotError::InvalidImageData)
        ));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = save_image("frame.tga", &[0; 4], 1, 1, &ScreenshotOptions::default());
        assert!(matches!(err, Err(ScreenshotError::UnsupportedFormat(ext)) if ext == "tga"));
    }
}
