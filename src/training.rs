//! Synthetic fit of a masked layer.
//!
//! A student [`MaskedLinear`] is regressed onto the outputs of a randomly
//! initialised target layer of the same order. The loop is the smallest
//! harness that drives burn's autodiff and an optimizer through the masked
//! product, so it doubles as an end-to-end check that masked-out weights
//! never move.

use std::{io, path::Path};

use burn::{
    nn::loss::{MseLoss, Reduction},
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::{ElementConversion, backend::AutodiffBackend},
};
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::BibdError,
    mask::MaskOrientation,
    masked_linear::{MaskedLinear, MaskedLinearConfig},
};

/// Files written into an artifact directory by a fit run.
pub const ARTIFACT_FILES: [&str; 3] = ["config.json", "report.json", "model.mpk"];

/// Create `dir` if needed and remove artifacts left by a previous run.
///
/// Only the entries of [`ARTIFACT_FILES`] are removed; anything else in the
/// directory is left alone.
pub fn prepare_artifact_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for name in ARTIFACT_FILES {
        match std::fs::remove_file(dir.join(name)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
            _ => {}
        }
    }
    Ok(())
}

#[derive(Config, Debug)]
pub struct FitConfig {
    pub order: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 200)]
    pub num_steps: usize,
    /// Plain SGD step on the mean-squared error. The per-weight curvature is
    /// about `2 / (3 r²)` for inputs uniform in `[-1, 1)`, so steps well
    /// below 1 converge slowly.
    #[config(default = 0.5)]
    pub learning_rate: f64,
    #[config(default = 42)]
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub order: usize,
    pub steps: usize,
    pub initial_loss: f32,
    pub final_loss: f32,
    /// Every weight outside the mask is bit-for-bit what it was at init.
    pub masked_weights_unchanged: bool,
}

/// Fit a student layer to a random target layer and return it with a report.
pub fn fit_synthetic<B: AutodiffBackend>(
    config: &FitConfig,
    device: &B::Device,
) -> Result<(MaskedLinear<B>, FitReport), BibdError> {
    B::seed(config.seed);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let layer_config = MaskedLinearConfig::for_order(config.order, MaskOrientation::PointsFromBlocks);
    let target: MaskedLinear<B> = layer_config.init(device)?;
    let mut student: MaskedLinear<B> = layer_config.init(device)?;
    let frozen_before = frozen_weights(&student);

    let mut optimizer = SgdConfig::new().init();
    let loss_fn = MseLoss::new();

    info!(
        "Fitting order {} masked layer ({} -> {}, {} live weights) for {} steps",
        config.order,
        student.d_input(),
        student.d_output(),
        student.connection_count(),
        config.num_steps
    );

    let mut initial_loss = None;
    let mut final_loss = 0.0;
    for step in 0..config.num_steps {
        let inputs = synthetic_batch::<B>(&mut rng, config.batch_size, student.d_input(), device);
        let targets = target.forward(inputs.clone()).detach();
        let outputs = student.forward(inputs);
        let loss = loss_fn.forward(outputs, targets, Reduction::Mean);

        let loss_value = loss.clone().into_scalar().elem::<f32>();
        initial_loss.get_or_insert(loss_value);
        final_loss = loss_value;
        if step % 50 == 0 {
            debug!("step {step:04}: loss {loss_value:.6}");
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &student);
        student = optimizer.step(config.learning_rate, student, grads);
    }

    let report = FitReport {
        order: config.order,
        steps: config.num_steps,
        initial_loss: initial_loss.unwrap_or(final_loss),
        final_loss,
        masked_weights_unchanged: frozen_weights(&student) == frozen_before,
    };
    info!(
        "Fit finished: loss {:.6} -> {:.6}, masked weights unchanged: {}",
        report.initial_loss, report.final_loss, report.masked_weights_unchanged
    );
    Ok((student, report))
}

/// Weight entries where the mask is zero, in row-major order.
pub fn frozen_weights<B: Backend>(layer: &MaskedLinear<B>) -> Vec<f32> {
    let weight = layer.weight.val().into_data();
    let mask = layer.mask().into_data();
    weight
        .iter::<f32>()
        .zip(mask.iter::<f32>())
        .filter(|&(_, m)| m == 0.0)
        .map(|(w, _)| w)
        .collect()
}

fn synthetic_batch<B: Backend>(
    rng: &mut StdRng,
    batch_size: usize,
    d_input: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values: Vec<f32> = (0..batch_size * d_input)
        .map(|_| rng.random_range(-1.0..1.0))
        .collect();
    Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([batch_size, d_input])
}
