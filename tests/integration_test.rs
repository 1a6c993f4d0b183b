use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use clap::Parser;
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array2;
use tempfile::TempDir;

use oil_spill_forensics::mocks::MockProbabilityModel;
use oil_spill_forensics::{
    Config, MetricsConfig, ProbabilityModel, SeverityTier, SpillAnalyzer, SpillError,
    SpillProcessor,
};

// Model whose output is always the wrong size.
#[derive(Debug, Clone)]
struct MisshapenModel {
    image_size: u32,
}

impl ProbabilityModel for MisshapenModel {
    fn input_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, _image: &RgbImage) -> oil_spill_forensics::Result<Array2<f32>> {
        let half = (self.image_size / 2) as usize;
        Ok(Array2::zeros((half, half)))
    }
}

fn config(input: &Path, output: &Path, extra: &[&str]) -> Config {
    let mut args: Vec<PathBuf> = vec![
        "spill-forensics".into(),
        input.into(),
        output.into(),
        "--model-path".into(),
        "unet.onnx".into(),
    ];
    args.extend(extra.iter().map(PathBuf::from));
    Config::parse_from(args)
}

/// Bright sea with a dark 20×10 slick in the corner.
fn write_scene(path: &Path) {
    write_scene_as(path, ImageFormat::Png);
}

fn write_scene_as(path: &Path, format: ImageFormat) {
    let mut image = RgbImage::from_pixel(64, 64, Rgb([230, 230, 230]));
    for y in 0..10 {
        for x in 0..20 {
            image.put_pixel(x, y, Rgb([5, 5, 5]));
        }
    }
    image.save_with_format(path, format).unwrap();
}

#[test]
fn test_directory_run_writes_all_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(input_dir.join("pass_2")).unwrap();

    write_scene(&input_dir.join("north.png"));
    write_scene(&input_dir.join("pass_2").join("south.png"));
    fs::write(input_dir.join("notes.txt"), "ignored").unwrap();

    let processor = SpillProcessor::new(
        MockProbabilityModel::dark_spot(64),
        config(&input_dir, &output_dir, &["--threshold", "0.5", "--sweep", "0.99"]),
    )
    .unwrap();
    let summary = processor.run().unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);

    for stem in ["north_png", "pass_2/south_png"] {
        for kind in ["input", "mask", "overlay", "panel"] {
            let path = output_dir.join(format!("{stem}_{kind}.png"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }

    let panel = image::open(output_dir.join("north_png_panel.png")).unwrap();
    assert_eq!(panel.width(), 64 * 3 + 8 * 2);
    assert_eq!(panel.height(), 64);

    let mask = image::open(output_dir.join("north_png_mask.png")).unwrap().to_luma8();
    assert_eq!(mask.get_pixel(0, 0).0, [255]);
    assert_eq!(mask.get_pixel(63, 63).0, [0]);

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output_dir.join("north_png_report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["oil_pixels"], 200);
    assert_eq!(report["total_pixels"], 4096);
    assert_eq!(report["severity"], "MODERATE");
    assert_eq!(report["sweep"][0]["oil_pixels"], 0);
    assert_eq!(report["sweep"][0]["severity"], "CLEAR");
}

#[test]
fn test_same_stem_inputs_keep_separate_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir).unwrap();

    write_scene(&input_dir.join("scene.png"));
    RgbImage::from_pixel(64, 64, Rgb([10, 10, 10]))
        .save_with_format(input_dir.join("scene.jpg"), ImageFormat::Jpeg)
        .unwrap();

    let processor = SpillProcessor::new(
        MockProbabilityModel::dark_spot(64),
        config(&input_dir, &output_dir, &["--threshold", "0.5"]),
    )
    .unwrap();
    let summary = processor.run().unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);

    let read = |name: &str| -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(output_dir.join(name)).unwrap()).unwrap()
    };
    let png = read("scene_png_report.json");
    let jpg = read("scene_jpg_report.json");
    assert!(png["source"].as_str().unwrap().ends_with("scene.png"));
    assert!(jpg["source"].as_str().unwrap().ends_with("scene.jpg"));
    assert_eq!(png["oil_pixels"], 200);
    assert_eq!(jpg["oil_pixels"], 4096);

    for name in ["scene_png", "scene_jpg"] {
        for kind in ["input", "mask", "overlay", "panel"] {
            let path = output_dir.join(format!("{name}_{kind}.png"));
            assert!(path.exists(), "missing {}", path.display());
        }
    }
}

#[test]
fn test_bad_upload_is_counted_and_others_continue() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir).unwrap();

    write_scene(&input_dir.join("good.png"));
    fs::write(input_dir.join("corrupt.png"), b"\x89PNG truncated").unwrap();

    let processor = SpillProcessor::new(
        MockProbabilityModel::dark_spot(64),
        config(&input_dir, &output_dir, &[]),
    )
    .unwrap();
    let summary = processor.run().unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert!(output_dir.join("good_png_report.json").exists());
    assert!(!output_dir.join("corrupt_png_report.json").exists());
}

#[test]
fn test_single_file_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("scene.png");
    let output_dir = temp_dir.path().join("out");
    write_scene(&input);

    let processor = SpillProcessor::new(
        MockProbabilityModel::constant(32, 1.0),
        config(&input, &output_dir, &["-f", "jpg"]),
    )
    .unwrap();
    let summary = processor.run().unwrap();
    assert_eq!(summary.processed, 1);
    assert!(output_dir.join("scene_png_overlay.jpg").exists());
    assert!(output_dir.join("scene_png_report.json").exists());
}

#[test]
fn test_missing_input_is_a_filesystem_error() {
    let temp_dir = TempDir::new().unwrap();
    let processor = SpillProcessor::new(
        MockProbabilityModel::constant(32, 1.0),
        config(
            &temp_dir.path().join("nope"),
            &temp_dir.path().join("out"),
            &[],
        ),
    )
    .unwrap();
    assert!(matches!(
        processor.run(),
        Err(SpillError::FileSystem { .. })
    ));
}

#[test]
fn test_model_output_shape_mismatch() {
    let analyzer = SpillAnalyzer::new(
        MisshapenModel { image_size: 32 },
        MetricsConfig::default(),
    )
    .unwrap();

    let mut bytes = Vec::new();
    RgbImage::new(40, 40)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let err = analyzer.analyze_bytes(&bytes, 0.05).unwrap_err();
    match err {
        SpillError::ShapeMismatch { expected, actual } => {
            assert_eq!(expected, vec![32, 32]);
            assert_eq!(actual, vec![16, 16]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decoded_all_ones_scene_is_critical() {
    let analyzer = SpillAnalyzer::new(
        MockProbabilityModel::constant(256, 1.0),
        MetricsConfig::default(),
    )
    .unwrap();

    let mut bytes = Vec::new();
    RgbImage::from_pixel(512, 300, Rgb([20, 40, 60]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();

    let analysis = analyzer.analyze_bytes(&bytes, 0.05).unwrap();
    assert_eq!(analysis.resized.dimensions(), (256, 256));
    assert_eq!(analysis.report.oil_pixels, 65_536);
    assert_eq!(analysis.report.severity, SeverityTier::Critical);

    let relaxed = analysis.rethreshold(1.0, analyzer.metrics()).unwrap();
    assert_eq!(relaxed.oil_pixels, 0);
    assert_eq!(relaxed.severity, SeverityTier::Clear);
}
