use clap::Parser;
use image::ImageFormat;
use std::path::PathBuf;

use crate::errors::Result;
use crate::metrics::{
    BlendMode, MetricsConfig, SeverityPolicy, DEFAULT_PIXEL_GROUND_AREA_M2, DEFAULT_THRESHOLD,
};

#[derive(Parser, Clone, Debug)]
#[command(
    version,
    about = "Detect oil spills in satellite images and assess the damage",
    long_about = None
)]
pub struct Config {
    /// Image file or directory of images (jpg, jpeg, png)
    pub input: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    /// ONNX segmentation model
    #[arg(short, long)]
    pub model_path: PathBuf,

    /// Detection sensitivity; lower values pick up fainter spills
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f32,

    /// Extra thresholds to re-evaluate from the same prediction
    #[arg(long, value_delimiter = ',', value_parser = parse_threshold)]
    pub sweep: Vec<f32>,

    /// Ground area of one pixel of the resized model input, in m²
    #[arg(long = "pixel-area-m2", default_value_t = DEFAULT_PIXEL_GROUND_AREA_M2)]
    pub pixel_ground_area_m2: f64,

    #[arg(long, default_value_t = SeverityPolicy::default().high_above_km2)]
    pub high_above_km2: f64,

    #[arg(long, default_value_t = SeverityPolicy::default().critical_above_km2)]
    pub critical_above_km2: f64,

    #[arg(long, value_enum, default_value_t = BlendMode::default())]
    pub blend: BlendMode,

    #[arg(short, long, default_value = "png", value_parser = check_format)]
    pub format: String,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Worker threads for directory runs (0 = all cores)
    #[arg(short = 'j', long, default_value_t = 0)]
    pub num_threads: usize,
}

impl Config {
    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            pixel_ground_area_m2: self.pixel_ground_area_m2,
            severity: SeverityPolicy {
                high_above_km2: self.high_above_km2,
                critical_above_km2: self.critical_above_km2,
            },
            blend: self.blend,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.metrics().validate()
    }

    /// Output format; `check_format` has already accepted the extension.
    pub fn image_format(&self) -> ImageFormat {
        ImageFormat::from_extension(&self.format).unwrap_or(ImageFormat::Png)
    }
}

fn parse_threshold(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s.trim().parse().map_err(|e| format!("{s} is not a number: {e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside the range 0.0-1.0"))
    }
}

fn check_format(s: &str) -> std::result::Result<String, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_extension(s)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(s.to_string())
}
