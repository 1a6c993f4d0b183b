use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::ArrayView2;

use crate::errors::{Result, SpillError};
use crate::metrics::BlendMode;

pub const ORIGINAL_WEIGHT: f32 = 0.7;
pub const TINT_WEIGHT: f32 = 0.3;

/// Red-only image whose red channel is `mask * 255`.
pub fn red_tint(mask: ArrayView2<u8>) -> RgbImage {
    let (height, width) = mask.dim();
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        Rgb([mask[[y as usize, x as usize]].saturating_mul(255), 0, 0])
    })
}

/// Grayscale rendering of a {0,1} mask, scaled so set pixels are white.
pub fn mask_to_luma(mask: ArrayView2<u8>) -> GrayImage {
    let (height, width) = mask.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([mask[[y as usize, x as usize]].saturating_mul(255)])
    })
}

/// Saturating `a * alpha + b * beta` per channel.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32) -> Result<RgbImage> {
    if a.dimensions() != b.dimensions() {
        return Err(dimension_mismatch(a.dimensions(), b.dimensions()));
    }
    Ok(RgbImage::from_fn(a.width(), a.height(), |x, y| {
        blend_pixel(a.get_pixel(x, y), alpha, b.get_pixel(x, y), beta)
    }))
}

/// Blends the red tint of `mask` into `image` at the fixed forensic weights.
pub fn forensic_overlay(image: &RgbImage, mask: ArrayView2<u8>, mode: BlendMode) -> Result<RgbImage> {
    let (height, width) = mask.dim();
    if image.dimensions() != (width as u32, height as u32) {
        return Err(dimension_mismatch(
            image.dimensions(),
            (width as u32, height as u32),
        ));
    }

    let tint = red_tint(mask);
    match mode {
        BlendMode::FullFrame => add_weighted(image, ORIGINAL_WEIGHT, &tint, TINT_WEIGHT),
        BlendMode::MaskedOnly => {
            let mut overlay = image.clone();
            for (x, y, pixel) in overlay.enumerate_pixels_mut() {
                if mask[[y as usize, x as usize]] != 0 {
                    *pixel = blend_pixel(pixel, ORIGINAL_WEIGHT, tint.get_pixel(x, y), TINT_WEIGHT);
                }
            }
            Ok(overlay)
        }
    }
}

fn blend_pixel(a: &Rgb<u8>, alpha: f32, b: &Rgb<u8>, beta: f32) -> Rgb<u8> {
    let Rgb([ar, ag, ab]) = *a;
    let Rgb([br, bg, bb]) = *b;
    let channel = |a: u8, b: u8| {
        (f32::from(a) * alpha + f32::from(b) * beta)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgb([channel(ar, br), channel(ag, bg), channel(ab, bb)])
}

fn dimension_mismatch(expected: (u32, u32), actual: (u32, u32)) -> SpillError {
    SpillError::shape_mismatch(
        &[expected.1 as usize, expected.0 as usize],
        &[actual.1 as usize, actual.0 as usize],
    )
}
