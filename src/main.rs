mod cmd;
mod core;

use crate::core::TaxYearRegistry;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "takehome",
    version,
    about = "UK take-home pay for employees, contractors and the self-employed"
)]
struct Opts {
    /// JSON file of extra or replacement tax-year configuration records
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take-home pay for one employment structure
    Calculate(cmd::calculate::CalculateCommand),
    /// Take-home pay under every structure for the same income
    Compare(cmd::compare::CompareCommand),
    /// Where an income sits in the UK income distribution
    Percentile(cmd::percentile::PercentileCommand),
    /// Sampled distribution curve for charts
    Curve(cmd::curve::CurveCommand),
    /// Calculate every record in a CSV file
    Batch(cmd::batch::BatchCommand),
    /// Print input schemas and CSV columns
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let registry = load_registry(opts.config.as_deref())?;

    match &opts.command {
        Command::Calculate(calculate) => calculate.exec(&registry),
        Command::Compare(compare) => compare.exec(&registry),
        Command::Percentile(percentile) => percentile.exec(),
        Command::Curve(curve) => curve.exec(),
        Command::Batch(batch) => batch.exec(&registry),
        Command::Schema(schema) => schema.exec(),
    }
}

/// Built-in tax years plus any from `--config`; invalid configuration stops here
fn load_registry(config: Option<&Path>) -> anyhow::Result<TaxYearRegistry> {
    let mut registry =
        TaxYearRegistry::builtin().context("Built-in tax year configuration is invalid")?;
    if let Some(path) = config {
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        registry
            .load_json(BufReader::new(file))
            .with_context(|| format!("Invalid tax year configuration in {}", path.display()))?;
    }
    let years: Vec<_> = registry.years().map(|year| year.label()).collect();
    log::debug!("Tax years available: {}", years.join(", "));
    Ok(registry)
}
