use std::path::PathBuf;

use anyhow::{Context, Result};
use bibd_rust::{
    device::{AutodiffBackend, init_device},
    training::{FitConfig, fit_synthetic, prepare_artifact_dir},
};
use burn::{config::Config, module::Module, record::CompactRecorder};
use clap::Parser;
use log::info;

#[derive(Parser)]
#[command(name = "train", about = "Fit a masked layer and save config, report and checkpoint")]
struct Args {
    /// Directory for config.json, report.json and model.mpk; other files are kept
    #[arg(default_value = "/tmp/bibd-training")]
    artifact_dir: PathBuf,
    #[arg(long, short, default_value_t = 5)]
    order: usize,
    #[arg(long, default_value_t = 500)]
    steps: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let artifact_dir = &args.artifact_dir;
    prepare_artifact_dir(artifact_dir)
        .with_context(|| format!("cannot prepare artifact directory {}", artifact_dir.display()))?;

    let device = init_device();
    let config = FitConfig::new(args.order).with_num_steps(args.steps);

    config
        .save(artifact_dir.join("config.json"))
        .context("config should be saved")?;

    let (model, report) = fit_synthetic::<AutodiffBackend>(&config, &device)?;

    std::fs::write(
        artifact_dir.join("report.json"),
        serde_json::to_string_pretty(&report)?,
    )
    .context("report should be saved")?;

    model
        .save_file(artifact_dir.join("model"), &CompactRecorder::new())
        .context("trained model should be saved")?;

    info!("Artifacts saved in: {}", artifact_dir.display());
    Ok(())
}
