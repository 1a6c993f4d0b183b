//! Operator-facing rendering of a [`SpillReport`]: summary text, JSON report
//! and the image artefacts.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;

use crate::analysis::Analysis;
use crate::errors::{Result, SpillError};
use crate::metrics::{MetricsConfig, SeverityTier, Threshold};
use crate::pipeline::SpillReport;
use crate::raster::panel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub threshold: Threshold,
    pub oil_pixels: u64,
    pub area_km2: f64,
    pub severity: SeverityTier,
}

impl From<&SpillReport> for SweepEntry {
    fn from(report: &SpillReport) -> Self {
        Self {
            threshold: report.threshold,
            oil_pixels: report.oil_pixels,
            area_km2: report.area_km2,
            severity: report.severity,
        }
    }
}

/// Serializable summary written next to the rendered images.
#[derive(Debug, Clone, Serialize)]
pub struct SpillSummary {
    pub source: PathBuf,
    pub threshold: Threshold,
    pub oil_pixels: u64,
    pub total_pixels: u64,
    pub area_km2: f64,
    pub confidence_pct: f32,
    pub severity: SeverityTier,
    pub banner: &'static str,
    pub pixel_ground_area_m2: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sweep: Vec<SweepEntry>,
}

impl SpillSummary {
    pub fn new(source: &Path, report: &SpillReport, metrics: &MetricsConfig) -> Self {
        Self {
            source: source.to_path_buf(),
            threshold: report.threshold,
            oil_pixels: report.oil_pixels,
            total_pixels: report.total_pixels(),
            area_km2: report.area_km2,
            confidence_pct: report.confidence_pct,
            severity: report.severity,
            banner: report.severity.banner(),
            pixel_ground_area_m2: metrics.pixel_ground_area_m2,
            sweep: Vec::new(),
        }
    }

    /// Re-evaluates `analysis` at each extra threshold.
    pub fn with_sweep(
        mut self,
        analysis: &Analysis,
        thresholds: &[f32],
        metrics: &MetricsConfig,
    ) -> Result<Self> {
        self.sweep = thresholds
            .iter()
            .map(|&t| analysis.rethreshold(t, metrics).map(|r| SweepEntry::from(&r)))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Metrics row as shown to the operator.
    pub fn metrics_line(&self) -> String {
        format!(
            "Detected Oil Pixels: {} | Est. Spill Area: {:.4} km² | Model Confidence: {:.1}%",
            self.oil_pixels, self.area_km2, self.confidence_pct
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SpillError::ImageProcessing {
            path: self.source.clone(),
            operation: "serialize report".to_string(),
            source: Box::new(e),
        })
    }
}

/// Paths of everything written for one input image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub input: PathBuf,
    pub mask: PathBuf,
    pub overlay: PathBuf,
    pub panel: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    /// `<dir>/<name>_{input,mask,overlay,panel}.<ext>` plus `<name>_report.json`,
    /// where `<name>` is the source file name with its extension folded in
    /// (`scene.png` → `scene_png`) so `scene.png` and `scene.jpg` in one
    /// directory get separate artefacts.
    pub fn new(dir: &Path, source: &Path, extension: &str) -> Self {
        let name = artifact_name(source);
        let image = |kind: &str| dir.join(format!("{name}_{kind}.{extension}"));
        Self {
            input: image("input"),
            mask: image("mask"),
            overlay: image("overlay"),
            panel: image("panel"),
            report: dir.join(format!("{name}_report.json")),
        }
    }
}

fn artifact_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "image".into());
    match source.extension() {
        Some(ext) => format!("{stem}_{}", ext.to_string_lossy()),
        None => stem.into_owned(),
    }
}

/// Writes the three views, the side-by-side panel and the JSON summary.
///
/// All or nothing: if any write fails, the files already written for this
/// image are removed again.
pub fn write_artifacts(
    paths: &ArtifactPaths,
    format: ImageFormat,
    analysis: &Analysis,
    summary: &SpillSummary,
) -> Result<()> {
    let mut written = Vec::with_capacity(5);
    let result = write_all(paths, format, analysis, summary, &mut written);
    if result.is_err() {
        for path in written {
            if let Err(e) = fs::remove_file(&path) {
                log::warn!("could not remove partial artefact {}: {e}", path.display());
            }
        }
    }
    result
}

fn write_all<'a>(
    paths: &'a ArtifactPaths,
    format: ImageFormat,
    analysis: &Analysis,
    summary: &SpillSummary,
    written: &mut Vec<&'a Path>,
) -> Result<()> {
    let report = &analysis.report;
    let mask = DynamicImage::ImageLuma8(report.mask.to_luma_image()).to_rgb8();
    let panel = panel::side_by_side(
        &[&analysis.resized, &mask, &report.overlay],
        panel::PANEL_GAP,
    );

    for (image, path) in [
        (&analysis.resized, &paths.input),
        (&mask, &paths.mask),
        (&report.overlay, &paths.overlay),
        (&panel, &paths.panel),
    ] {
        save(image, path, format)?;
        written.push(path);
    }

    fs::write(&paths.report, summary.to_json()?).map_err(|e| SpillError::FileSystem {
        path: paths.report.clone(),
        operation: "write report".to_string(),
        source: e,
    })?;
    written.push(&paths.report);
    Ok(())
}

fn save(image: &RgbImage, path: &Path, format: ImageFormat) -> Result<()> {
    image
        .save_with_format(path, format)
        .map_err(|e| SpillError::ImageProcessing {
            path: path.to_path_buf(),
            operation: "save image".to_string(),
            source: Box::new(e),
        })
}
