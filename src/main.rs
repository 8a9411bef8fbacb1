use anyhow::{Context, Result};
use bibd_rust::{
    device::{AutodiffBackend, init_device},
    generate_mask, generate_mask_checked,
    training::{FitConfig, fit_synthetic},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bibd-rust", about = "BIBD connectivity masks for sparse linear layers")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the incidence matrix of a BIBD order
    Mask {
        #[arg(long, short)]
        order: usize,
        /// Refuse orders that are not prime powers
        #[arg(long)]
        strict: bool,
    },
    /// Print design statistics of a BIBD order as JSON
    Summary {
        #[arg(long, short)]
        order: usize,
        /// Refuse orders that are not prime powers
        #[arg(long)]
        strict: bool,
    },
    /// Fit a masked layer to a random target layer and report the losses
    Fit {
        #[arg(long, short)]
        order: usize,
        /// Defaults to the FitConfig value
        #[arg(long)]
        steps: Option<usize>,
        /// Defaults to the FitConfig value
        #[arg(long)]
        lr: Option<f64>,
        /// Defaults to the FitConfig value
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Cmd::Mask { order, strict } => {
            let mask = if strict {
                generate_mask_checked(order)
            } else {
                generate_mask(order)
            }
            .with_context(|| format!("cannot build mask of order {order}"))?;
            print!("{mask}");
        }
        Cmd::Summary { order, strict } => {
            let mask = if strict {
                generate_mask_checked(order)
            } else {
                generate_mask(order)
            }
            .with_context(|| format!("cannot build mask of order {order}"))?;
            println!("{}", serde_json::to_string_pretty(&mask.summary())?);
        }
        Cmd::Fit {
            order,
            steps,
            lr,
            seed,
        } => {
            let mut config = FitConfig::new(order);
            if let Some(steps) = steps {
                config.num_steps = steps;
            }
            if let Some(lr) = lr {
                config.learning_rate = lr;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let device = init_device();
            let (_, report) = fit_synthetic::<AutodiffBackend>(&config, &device)
                .context("synthetic fit failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
