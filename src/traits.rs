use crate::errors::Result;
use image::RgbImage;
use ndarray::Array2;

/// Binary-segmentation model producing per-pixel spill probabilities.
///
/// Implementations are loaded once and owned by the analyzer for every run.
pub trait ProbabilityModel: Send + Sync {
    /// Side length of the square input the model expects.
    fn input_size(&self) -> u32;

    /// Probability map `(height, width)` for an image already resized to
    /// `input_size`×`input_size`.
    fn predict(&self, image: &RgbImage) -> Result<Array2<f32>>;
}
