use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use deckmc_bench::config::{BenchConfig, ResolvedOutputs, ScenarioKind};
use deckmc_bench::logging::init_logging;
use deckmc_bench::runner::ScenarioRunner;
use deckmc_core::sampling::PmfConvention;
use deckmc_core::weighting::MixingWeights;

/// Batch driver for the card-deck Monte Carlo estimators.
#[derive(Debug, Parser)]
#[command(
    name = "deckmc-bench",
    author,
    version,
    about = "Deterministic Monte Carlo convergence runs over a 52-card deck"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the scenario to run.
    #[arg(long, value_enum)]
    scenario: Option<ScenarioKind>,

    /// Override the RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the samples drawn per batch.
    #[arg(long, value_name = "COUNT")]
    batch_size: Option<usize>,

    /// Override the sample-count ceiling.
    #[arg(long, value_name = "COUNT")]
    samples: Option<usize>,

    /// PMF constants reported by the biased proposals (demo or normalized).
    #[arg(long, value_name = "CONVENTION", value_parser = parse_convention)]
    pmf_convention: Option<PmfConvention>,

    /// Balance-heuristic weight of the face-biased proposal; red gets the remainder.
    #[arg(long, value_name = "WEIGHT")]
    face_mix: Option<f64>,

    /// Sleep between batches at the scenario's default cadence.
    #[arg(long)]
    paced: bool,

    /// Exit after validating the configuration (no samples are drawn).
    #[arg(long)]
    validate_only: bool,
}

fn parse_convention(value: &str) -> Result<PmfConvention, String> {
    match value.to_ascii_lowercase().as_str() {
        "demo" => Ok(PmfConvention::Demo),
        "normalized" => Ok(PmfConvention::Normalized),
        other => Err(format!("unknown PMF convention '{other}' (expected demo or normalized)")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(kind) = cli.scenario {
        if kind != config.scenario.kind {
            // Sizes tuned for the configured scenario do not carry over.
            config.scenario.batch_size = None;
            config.scenario.sample_limit = None;
        }
        config.scenario.kind = kind;
    }

    if let Some(seed) = cli.seed {
        config.scenario.seed = Some(seed);
    }

    if let Some(batch_size) = cli.batch_size {
        config.scenario.batch_size = Some(batch_size);
    }

    if let Some(samples) = cli.samples {
        config.scenario.sample_limit = Some(samples);
    }

    if let Some(convention) = cli.pmf_convention {
        config.scenario.pmf_convention = convention;
    }

    if let Some(face) = cli.face_mix {
        config.scenario.mixing =
            MixingWeights::new(face, 1.0 - face).context("invalid --face-mix")?;
    }

    if cli.paced {
        config.scenario.paced = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let scenario = config.scenario.kind;

    println!(
        "Loaded configuration '{run_id}': scenario {} ({} per batch, ceiling {}, {} PMFs)",
        scenario.as_str(),
        config.scenario.batch_size(),
        config.scenario.sample_limit(),
        config.scenario.pmf_convention.as_str()
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = ScenarioRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: sampling skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} samples in {} batches → {} rows at {}",
        summary.samples_drawn,
        summary.batches,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for estimate in &summary.report.estimates {
        match estimate.expected {
            Some(expected) => println!(
                "  {:<22} {:>9.4} (expected {:.4})",
                estimate.name, estimate.value, expected
            ),
            None => println!("  {:<22} {:>9.4}", estimate.name, estimate.value),
        }
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Convergence plot: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
