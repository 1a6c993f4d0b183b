use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;

use oil_spill_forensics::{Config, Model, ProbabilityModel, SpillProcessor};

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    ensure!(config.model_path.exists(), "Model path does not exist");
    ensure!(config.input.exists(), "Input path does not exist");
    config.validate().context("Invalid metrics configuration")?;

    if config.num_threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()?;
    }

    let model = Model::load(&config.model_path, config.device_id)
        .with_context(|| format!("Failed to load model: {}", config.model_path.display()))?;
    log::info!(
        "model loaded: {} ({:?}, {}x{} input)",
        config.model_path.display(),
        model.layout(),
        model.input_size(),
        model.input_size()
    );
    log::debug!(
        "{} m² per pixel; this holds only for the resolution the model was trained on",
        config.pixel_ground_area_m2
    );

    let processor = SpillProcessor::new(model, config)?;
    let summary = processor.run()?;

    log::info!(
        "{} image(s) processed, {} failed",
        summary.processed,
        summary.failed
    );
    Ok(if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
