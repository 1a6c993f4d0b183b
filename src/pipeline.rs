//! Post-processing from a raw probability map to the reported spill metrics.

use image::{GrayImage, RgbImage};
use ndarray::{Array2, ArrayView2, ArrayViewD, Axis, Ix2, Zip};

use crate::errors::{Result, SpillError};
use crate::metrics::{MetricsConfig, SeverityTier, Threshold};
use crate::raster::overlay;

/// Per-pixel spill decision, `1` where the probability exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(Array2<u8>);

impl BinaryMask {
    pub fn from_probabilities(probabilities: ArrayView2<f32>, threshold: Threshold) -> Self {
        let threshold = threshold.value();
        Self(probabilities.mapv(|p| u8::from(p > threshold)))
    }

    pub fn count(&self) -> u64 {
        self.0.iter().filter(|&&bit| bit != 0).count() as u64
    }

    /// `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }

    pub fn view(&self) -> ArrayView2<u8> {
        self.0.view()
    }

    pub fn to_luma_image(&self) -> GrayImage {
        overlay::mask_to_luma(self.view())
    }
}

/// Everything derived from one (image, probability map, threshold) run.
#[derive(Debug, Clone)]
pub struct SpillReport {
    pub threshold: Threshold,
    pub mask: BinaryMask,
    pub overlay: RgbImage,
    pub oil_pixels: u64,
    pub area_km2: f64,
    pub confidence_pct: f32,
    pub severity: SeverityTier,
}

impl SpillReport {
    pub fn total_pixels(&self) -> u64 {
        let (height, width) = self.mask.dim();
        (height * width) as u64
    }
}

/// Accepts `(H, W)` or `(H, W, 1)` and returns the 2-D view.
fn spatial_view<'a>(
    probabilities: ArrayViewD<'a, f32>,
    expected: &[usize],
) -> Result<ArrayView2<'a, f32>> {
    let shape = probabilities.shape().to_vec();
    match shape.as_slice() {
        [_, _] => Ok(probabilities.into_dimensionality::<Ix2>()?),
        [_, _, 1] => Ok(probabilities
            .index_axis_move(Axis(2), 0)
            .into_dimensionality::<Ix2>()?),
        _ => Err(SpillError::shape_mismatch(expected, &shape)),
    }
}

/// Runs thresholding, metrics, overlay and severity banding.
///
/// Pure; fails on out-of-range thresholds, mismatched spatial dimensions, or
/// probabilities that are NaN or outside `[0, 1]`.
pub fn compute_spill_report(
    resized_image: &RgbImage,
    probabilities: ArrayViewD<f32>,
    threshold: f32,
    config: &MetricsConfig,
) -> Result<SpillReport> {
    let threshold = Threshold::new(threshold)?;
    let map = spatial_view(probabilities, &image_shape(resized_image))?;
    report_from_map(resized_image, map, threshold, config)
}

pub(crate) fn report_from_map(
    resized_image: &RgbImage,
    map: ArrayView2<f32>,
    threshold: Threshold,
    config: &MetricsConfig,
) -> Result<SpillReport> {
    let expected = image_shape(resized_image);
    if map.shape() != expected.as_slice() {
        return Err(SpillError::shape_mismatch(&expected, map.shape()));
    }
    check_probabilities(map)?;

    let mask = BinaryMask::from_probabilities(map, threshold);
    let oil_pixels = mask.count();
    let area_km2 = config.area_km2(oil_pixels);
    let confidence_pct = map.iter().copied().fold(0.0f32, f32::max) * 100.0;
    let overlay = overlay::forensic_overlay(resized_image, mask.view(), config.blend)?;
    let severity = config.severity.classify(area_km2);

    Ok(SpillReport {
        threshold,
        mask,
        overlay,
        oil_pixels,
        area_km2,
        confidence_pct,
        severity,
    })
}

fn check_probabilities(map: ArrayView2<f32>) -> Result<()> {
    let mut first_bad = None;
    Zip::indexed(map).for_each(|(row, col), &value| {
        if first_bad.is_none() && !(0.0..=1.0).contains(&value) {
            first_bad = Some(SpillError::ProbabilityOutOfRange { value, row, col });
        }
    });
    first_bad.map_or(Ok(()), Err)
}

fn image_shape(image: &RgbImage) -> Vec<usize> {
    vec![image.height() as usize, image.width() as usize]
}
