pub mod overlay;
pub mod panel;

use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::errors::{Result, SpillError};

/// Resampling used when fitting uploads to the model input.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Decodes an uploaded JPEG/PNG and resizes it to the square model input.
pub fn decode_and_resize(bytes: &[u8], size: u32) -> Result<RgbImage> {
    let image = decode(bytes)?;
    resize_to_model(&image, size)
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(SpillError::DecodeFailure {
            reason: "empty upload".to_string(),
            source: None,
        });
    }
    image::load_from_memory(bytes).map_err(|e| SpillError::DecodeFailure {
        reason: "not a decodable raster".to_string(),
        source: Some(e),
    })
}

/// Converts to RGB and stretches to `size`×`size`, ignoring aspect ratio.
pub fn resize_to_model(image: &DynamicImage, size: u32) -> Result<RgbImage> {
    if size == 0 {
        return Err(SpillError::Configuration {
            message: "model input size must be non-zero".to_string(),
        });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(SpillError::DecodeFailure {
            reason: format!("image has no pixels ({}x{})", image.width(), image.height()),
            source: None,
        });
    }

    let rgb = image.to_rgb8();
    if rgb.dimensions() == (size, size) {
        return Ok(rgb);
    }
    Ok(image::imageops::resize(&rgb, size, size, RESIZE_FILTER))
}
