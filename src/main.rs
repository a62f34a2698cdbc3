//! rop-ab-test: retrospective A/B test of inventory reorder-point policies.
//!
//! # Usage
//!
//! Run the full pipeline against a dataset:
//! ```sh
//! rop-ab-test run --data data/daily_demand.csv --out results
//! ```
//!
//! Fabricate a seeded synthetic dataset first:
//! ```sh
//! rop-ab-test generate --out data/daily_demand.csv --skus 20 --days 180
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rop_ab_test::analysis::metrics::{summarize_group, summarize_run, SkuSummary};
use rop_ab_test::analysis::roi::calculate_roi;
use rop_ab_test::io::dataset::load_dataset;
use rop_ab_test::io::demand::{write_dataset, GeneratorParams};
use rop_ab_test::io::reporting;
use rop_ab_test::model::sku::{assign_groups_stratified, TestGroup};
use rop_ab_test::simulation::config::{ExperimentConfig, GroupAssignment};
use rop_ab_test::simulation::engine::{run_ab_test, DayRecord};

#[derive(Parser, Debug)]
#[command(name = "rop-ab-test")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate both policy arms and write the comparison reports
    Run {
        /// Daily demand dataset (CSV)
        #[arg(long, short = 'd')]
        data: PathBuf,

        /// Experiment configuration (TOML); defaults apply when omitted
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output directory for report tables
        #[arg(long, short = 'o', default_value = "results")]
        out: PathBuf,
    },
    /// Write a seeded synthetic dataset
    Generate {
        /// Output CSV path
        #[arg(long, short = 'o', default_value = "data/daily_demand.csv")]
        out: PathBuf,

        #[arg(long, default_value_t = 20)]
        skus: usize,

        /// Days of history per SKU (horizon plus baseline window)
        #[arg(long, default_value_t = 180)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date of the series (YYYY-MM-DD)
        #[arg(long, default_value = "2025-01-01")]
        start_date: NaiveDate,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Commands::Run { data, config, out } => run_pipeline(data, config, out),
        Commands::Generate {
            out,
            skus,
            days,
            seed,
            start_date,
        } => generate(out, skus, days, seed, start_date),
    }
}

fn run_pipeline(data: PathBuf, config_path: Option<PathBuf>, out: PathBuf) -> Result<()> {
    // 1. Configuration
    let config = match &config_path {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExperimentConfig::default(),
    };

    // 2. Dataset
    let mut skus = load_dataset(&data, config.simulation.horizon_days)
        .with_context(|| format!("loading dataset {}", data.display()))?;
    if config.ab_test.assignment == GroupAssignment::Stratified {
        info!(seed = config.ab_test.random_seed, "reassigning groups by stratified randomization");
        assign_groups_stratified(&mut skus, config.ab_test.random_seed);
    }

    // 3. Simulation: control SKUs under the fixed formula, treatment under
    //    the dynamic one
    info!(
        skus = skus.len(),
        horizon = config.simulation.horizon_days,
        "running A/B simulation"
    );
    let runs = run_ab_test(&skus, &config).context("simulation failed")?;

    // 4. Aggregation
    let summaries: Vec<SkuSummary> = runs.iter().map(summarize_run).collect();
    let control = summarize_group(TestGroup::Control, &summaries).ok();
    let treatment = summarize_group(TestGroup::Treatment, &summaries).ok();

    // 5. Hypothesis tests and ROI projection
    let outcomes = rop_ab_test::analysis::analyze(&summaries, config.ab_test.alpha);
    let roi = match (&control, &treatment) {
        (Some(c), Some(t)) => Some(calculate_roi(c, t, &config.costs)),
        _ => None,
    };

    // 6. Reports
    std::fs::create_dir_all(&out)
        .with_context(|| format!("creating output directory {}", out.display()))?;
    let traces: Vec<DayRecord> = runs.iter().flat_map(|r| r.trace.iter().cloned()).collect();
    reporting::write_trace(&out.join("daily_trace.csv"), &traces)?;
    reporting::write_sku_summaries(&out.join("sku_summaries.csv"), &summaries)?;
    let groups: Vec<_> = [control.clone(), treatment.clone()].into_iter().flatten().collect();
    reporting::write_group_summaries(&out.join("group_summaries.csv"), &groups)?;
    reporting::write_statistical_results(&out.join("statistical_results.csv"), &outcomes)?;
    if let Some(roi) = &roi {
        reporting::write_roi(&out.join("roi_analysis.csv"), roi)?;
    }
    reporting::write_executive_summary(
        &out.join("executive_summary.txt"),
        &config,
        control.as_ref(),
        treatment.as_ref(),
        &outcomes,
        roi.as_ref(),
    )?;

    info!(out = %out.display(), "analysis complete");
    Ok(())
}

fn generate(out: PathBuf, skus: usize, days: usize, seed: u64, start_date: NaiveDate) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let params = GeneratorParams {
        sku_count: skus,
        days,
        seed,
        start_date,
    };
    write_dataset(&out, &params).with_context(|| format!("writing dataset {}", out.display()))?;
    Ok(())
}
