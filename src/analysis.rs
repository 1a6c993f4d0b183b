use image::{DynamicImage, RgbImage};
use ndarray::Array2;

use crate::errors::Result;
use crate::metrics::{MetricsConfig, Threshold};
use crate::pipeline::{report_from_map, SpillReport};
use crate::raster;
use crate::traits::ProbabilityModel;

/// Owns the loaded model for the life of the process.
///
/// Built once at start-up and borrowed for every run; the model is never
/// reloaded.
pub struct SpillAnalyzer<M: ProbabilityModel> {
    model: M,
    metrics: MetricsConfig,
}

/// One inference plus the report for the threshold it was first run at.
///
/// Keeps the resized input and probability map so other thresholds can be
/// evaluated without another forward pass.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub resized: RgbImage,
    pub probabilities: Array2<f32>,
    pub report: SpillReport,
}

impl<M: ProbabilityModel> SpillAnalyzer<M> {
    pub fn new(model: M, metrics: MetricsConfig) -> Result<Self> {
        metrics.validate()?;
        Ok(Self { model, metrics })
    }

    pub const fn metrics(&self) -> &MetricsConfig {
        &self.metrics
    }

    /// Decodes an uploaded JPEG/PNG and analyses it.
    pub fn analyze_bytes(&self, bytes: &[u8], threshold: f32) -> Result<Analysis> {
        let threshold = Threshold::new(threshold)?;
        let resized = raster::decode_and_resize(bytes, self.model.input_size())?;
        self.analyze_resized(resized, threshold)
    }

    pub fn analyze_image(&self, image: &DynamicImage, threshold: f32) -> Result<Analysis> {
        let threshold = Threshold::new(threshold)?;
        let resized = raster::resize_to_model(image, self.model.input_size())?;
        self.analyze_resized(resized, threshold)
    }

    fn analyze_resized(&self, resized: RgbImage, threshold: Threshold) -> Result<Analysis> {
        let probabilities = self.model.predict(&resized)?;
        let report = report_from_map(&resized, probabilities.view(), threshold, &self.metrics)?;
        Ok(Analysis {
            resized,
            probabilities,
            report,
        })
    }
}

impl Analysis {
    /// Recomputes the report from the cached probability map.
    pub fn rethreshold(&self, threshold: f32, metrics: &MetricsConfig) -> Result<SpillReport> {
        let threshold = Threshold::new(threshold)?;
        report_from_map(&self.resized, self.probabilities.view(), threshold, metrics)
    }
}
