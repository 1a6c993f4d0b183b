pub mod analysis;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod raster;
pub mod report;
pub mod traits;

pub mod mocks;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use walkdir::WalkDir;

pub use analysis::{Analysis, SpillAnalyzer};
pub use config::Config;
pub use errors::{Result, SpillError};
pub use metrics::{BlendMode, MetricsConfig, SeverityPolicy, SeverityTier, Threshold};
pub use model::Model;
pub use pipeline::{compute_spill_report, BinaryMask, SpillReport};
pub use report::{ArtifactPaths, SpillSummary};
pub use traits::ProbabilityModel;

/// Counts from one file or directory run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Drives the analyzer over a file or a directory tree and writes the
/// artefacts for every image.
pub struct SpillProcessor<M: ProbabilityModel> {
    analyzer: SpillAnalyzer<M>,
    config: Config,
}

impl<M: ProbabilityModel> SpillProcessor<M> {
    pub fn new(model: M, config: Config) -> Result<Self> {
        let analyzer = SpillAnalyzer::new(model, config.metrics())?;
        Ok(Self { analyzer, config })
    }

    pub fn run(&self) -> Result<RunSummary> {
        let input_path = &self.config.input;
        if !input_path.exists() {
            return Err(SpillError::FileSystem {
                path: input_path.clone(),
                operation: "check input".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input path does not exist",
                ),
            });
        }

        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| SpillError::FileSystem {
            path: output_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        if input_path.is_file() {
            let summary = self.process_single_image(input_path, output_dir)?;
            log_summary(&summary);
            return Ok(RunSummary {
                processed: 1,
                failed: 0,
            });
        }

        let image_files = self.collect_image_files(input_path);
        if image_files.is_empty() {
            log::warn!("no jpg/jpeg/png images found under {}", input_path.display());
            return Ok(RunSummary::default());
        }

        let pb = ProgressBar::new(image_files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let failed = AtomicUsize::new(0);
        image_files.par_iter().for_each(|input_file| {
            match self.process_single_image(input_file, output_dir) {
                Ok(summary) => pb.suspend(|| log_summary(&summary)),
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    pb.suspend(|| log::error!("{}: {e}", input_file.display()));
                }
            }
            pb.inc(1);
        });
        pb.finish_and_clear();

        let failed = failed.into_inner();
        Ok(RunSummary {
            processed: image_files.len() - failed,
            failed,
        })
    }

    fn collect_image_files(&self, input_path: &Path) -> Vec<PathBuf> {
        let mut image_files: Vec<_> = WalkDir::new(input_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported_image_format(e.path()))
            .map(|e| e.into_path())
            .collect();
        image_files.sort();
        image_files
    }

    pub fn is_supported_image_format(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            matches!(extension.to_lowercase().as_str(), "jpg" | "jpeg" | "png")
        } else {
            false
        }
    }

    /// Analyses one image and writes its artefacts under `output_dir`,
    /// mirroring the file's location relative to the input directory.
    pub fn process_single_image(&self, input_file: &Path, output_dir: &Path) -> Result<SpillSummary> {
        let bytes = fs::read(input_file).map_err(|e| SpillError::FileSystem {
            path: input_file.to_path_buf(),
            operation: "read image".to_string(),
            source: e,
        })?;

        let analysis = self.analyzer.analyze_bytes(&bytes, self.config.threshold)?;
        let metrics = self.analyzer.metrics();
        let summary = SpillSummary::new(input_file, &analysis.report, metrics)
            .with_sweep(&analysis, &self.config.sweep, metrics)?;

        let relative_path = self.get_relative_path(input_file)?;
        let target_dir = output_dir.join(relative_path.parent().unwrap_or(Path::new("")));
        fs::create_dir_all(&target_dir).map_err(|e| SpillError::FileSystem {
            path: target_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        let paths = ArtifactPaths::new(&target_dir, input_file, &self.config.format);
        report::write_artifacts(&paths, self.config.image_format(), &analysis, &summary)?;

        Ok(summary)
    }

    /// Path of `input_file` relative to the input directory; a single-file
    /// input maps to its bare file name.
    pub fn get_relative_path(&self, input_file: &Path) -> Result<PathBuf> {
        let input = &self.config.input;
        if input.is_file() || input == input_file {
            return Ok(input_file
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default());
        }
        input_file
            .strip_prefix(input)
            .map(|p| p.to_path_buf())
            .map_err(|_| SpillError::FileSystem {
                path: input_file.to_path_buf(),
                operation: "resolve relative path".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "file is not inside the input directory",
                ),
            })
    }
}

fn log_summary(summary: &SpillSummary) {
    log::info!("{}: {}", summary.source.display(), summary.metrics_line());
    match summary.severity {
        SeverityTier::Critical | SeverityTier::High => {
            log::warn!("{}: {}", summary.source.display(), summary.banner)
        }
        SeverityTier::Moderate | SeverityTier::Clear => {
            log::info!("{}: {}", summary.source.display(), summary.banner)
        }
    }
    for entry in &summary.sweep {
        log::info!(
            "{}:   threshold {} -> {} px, {:.4} km², {}",
            summary.source.display(),
            entry.threshold,
            entry.oil_pixels,
            entry.area_km2,
            entry.severity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockProbabilityModel;
    use clap::Parser;

    fn config(input: &Path, output: &Path) -> Config {
        Config::parse_from([
            Path::new("spill-forensics"),
            input,
            output,
            Path::new("--model-path"),
            Path::new("unet.onnx"),
        ])
    }

    #[test]
    fn test_supported_formats() {
        let processor = SpillProcessor::new(
            MockProbabilityModel::constant(8, 0.0),
            config(Path::new("in"), Path::new("out")),
        )
        .unwrap();

        let test_cases = vec![
            ("scene.jpg", true),
            ("scene.JPEG", true),
            ("scene.png", true),
            ("scene.webp", false),
            ("scene.txt", false),
            ("scene", false),
        ];
        for (filename, expected) in test_cases {
            assert_eq!(
                processor.is_supported_image_format(Path::new(filename)),
                expected,
                "{filename}"
            );
        }
    }

    #[test]
    fn test_relative_path_calculation() -> Result<()> {
        use tempfile::TempDir;

        let temp_dir = TempDir::new()?;
        let input_dir = temp_dir.path().join("input");
        let subdir = input_dir.join("subdir");
        fs::create_dir_all(&subdir)?;

        let processor = SpillProcessor::new(
            MockProbabilityModel::constant(8, 0.0),
            config(&input_dir, Path::new("output")),
        )?;

        let relative = processor.get_relative_path(&subdir.join("scene.jpg"))?;
        assert_eq!(relative, Path::new("subdir/scene.jpg"));

        let outside = processor.get_relative_path(Path::new("/elsewhere/scene.jpg"));
        assert!(matches!(outside, Err(SpillError::FileSystem { .. })));
        Ok(())
    }
}
