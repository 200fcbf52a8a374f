#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates and prints Diamond-Square height maps.

mod output;

use std::{
    io::{self, BufWriter, Write},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use dsmap_core::{HeightParams, PrngAlgorithm};
use dsmap_engine::HeightMapEngine;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use crate::output::{write_grid, OutputFormat};

/// Upper bound (exclusive) of generated seeds when `--random-seed` is set.
const RANDOM_SEED_RANGE: u32 = 10_000_000;

/// Generates a Diamond-Square height map and prints it to stdout.
#[derive(Debug, Parser)]
#[command(name = "dsmap", version, about)]
struct Cli {
    /// Grid size exponent; the map has 2^degree + 1 cells per side.
    #[arg(long, default_value_t = 8)]
    degree: u32,
    /// Maximum height of the four corner seeds.
    #[arg(long, default_value_t = 64.0)]
    height: f64,
    /// Perturbation magnitude at the coarsest pass.
    #[arg(long, default_value_t = 64.0)]
    roughness: f64,
    /// Seed the random stream is derived from.
    #[arg(long, default_value = "17")]
    seed: String,
    /// Ignore `--seed` and pick a fresh random one.
    #[arg(long)]
    random_seed: bool,
    /// Draw from the higher-period alternate generator.
    #[arg(long)]
    alternate: bool,
    /// Rescale the map into [0, SCALE] after calculating it.
    #[arg(long, value_name = "SCALE", num_args = 0..=1, default_missing_value = "1")]
    normalize: Option<f64>,
    /// Layout of the printed grid.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    /// Digits printed after the decimal point.
    #[arg(long, default_value_t = 3)]
    precision: usize,
}

impl Cli {
    fn algorithm(&self) -> PrngAlgorithm {
        if self.alternate {
            PrngAlgorithm::Alternate
        } else {
            PrngAlgorithm::Standard
        }
    }

    fn resolve_seed(&self) -> String {
        if self.random_seed {
            rand::thread_rng().gen_range(0..RANDOM_SEED_RANGE).to_string()
        } else {
            self.seed.clone()
        }
    }
}

/// Entry point for the dsmap command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let params = HeightParams::new(cli.height, cli.roughness).context("invalid map parameters")?;
    let mut engine =
        HeightMapEngine::new(cli.degree, params).context("could not create the height map")?;

    let seed = cli.resolve_seed();
    let start = Instant::now();
    engine.seed(seed.as_str(), cli.algorithm());
    let _ = engine.calculate().context("height map calculation failed")?;
    if let Some(scale) = cli.normalize {
        let _ = engine
            .normalize(scale)
            .with_context(|| format!("could not normalize the map to {scale}"))?;
    }
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis(),
        seed = %seed,
        size = engine.size(),
        "calculated height map"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_grid(engine.grid(), cli.format, cli.precision, &mut out)
        .context("could not write the grid to stdout")?;
    out.flush().context("could not flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_settings() {
        let cli = Cli::try_parse_from(["dsmap"]).expect("defaults parse");
        assert_eq!(cli.degree, 8);
        assert_eq!(cli.height, 64.0);
        assert_eq!(cli.roughness, 64.0);
        assert_eq!(cli.resolve_seed(), "17");
        assert_eq!(cli.algorithm(), PrngAlgorithm::Standard);
        assert_eq!(cli.normalize, None);
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn bare_normalize_flag_uses_unit_scale() {
        let cli = Cli::try_parse_from(["dsmap", "--normalize"]).expect("parse");
        assert_eq!(cli.normalize, Some(1.0));

        let cli = Cli::try_parse_from(["dsmap", "--normalize", "50"]).expect("parse");
        assert_eq!(cli.normalize, Some(50.0));
    }

    #[test]
    fn random_seed_stays_in_range() {
        let cli = Cli::try_parse_from(["dsmap", "--random-seed", "--alternate"]).expect("parse");
        let seed: u32 = cli.resolve_seed().parse().expect("numeric seed");
        assert!(seed < RANDOM_SEED_RANGE);
        assert_eq!(cli.algorithm(), PrngAlgorithm::Alternate);
    }

    #[test]
    fn invalid_degree_is_reported() {
        let cli = Cli::try_parse_from(["dsmap", "--degree", "0"]).expect("parse");
        let error = run(&cli).expect_err("degree zero is rejected");
        assert!(format!("{error:#}").contains("degree"));
    }
}
