use image::{imageops, Rgb, RgbImage};

pub const PANEL_GAP: u32 = 8;
pub const PANEL_BACKGROUND: Rgb<u8> = Rgb([32, 32, 32]);

/// Lays the images out left to right, top-aligned, separated by `gap` pixels.
pub fn side_by_side(images: &[&RgbImage], gap: u32) -> RgbImage {
    let height = images.iter().map(|image| image.height()).max().unwrap_or(0);
    let width = images.iter().map(|image| image.width()).sum::<u32>()
        + gap * (images.len() as u32).saturating_sub(1);

    let mut canvas = RgbImage::from_pixel(width, height, PANEL_BACKGROUND);
    let mut x = 0i64;
    for image in images {
        imageops::overlay(&mut canvas, *image, x, 0);
        x += i64::from(image.width() + gap);
    }
    canvas
}
