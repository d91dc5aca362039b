use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use market_daily::config::load_config;
use market_daily::pipeline::DailyPipeline;
use market_daily::source::{MarketSnapshot, SnapshotSource};
use market_daily::synthetic::{MarketScenario, SyntheticMarketGenerator};

/// Derive the daily market report (breadth, group rankings, regime) from a
/// market snapshot.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Market snapshot JSON produced by the upstream extractor.
    #[arg(long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    input: Option<PathBuf>,

    /// Run against a generated market instead of a snapshot file.
    #[arg(long)]
    synthetic: bool,

    /// Seed for the synthetic market.
    #[arg(long, default_value_t = 42, requires = "synthetic")]
    seed: u64,

    /// Number of synthetic instruments.
    #[arg(long, default_value_t = 200, requires = "synthetic")]
    instruments: usize,

    /// Number of synthetic business days.
    #[arg(long, default_value_t = 120, requires = "synthetic")]
    days: usize,

    /// Report date (format: YYYY-MM-DD). Defaults to the latest trade date.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// TOML configuration file; MARKET_DAILY__* variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let snapshot = if cli.synthetic {
        let end = cli
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        tracing::info!(seed = cli.seed, instruments = cli.instruments, days = cli.days, "generating synthetic market");
        SyntheticMarketGenerator::new(cli.seed).generate(MarketScenario::Sideways, cli.instruments, cli.days, end)
    } else if let Some(path) = &cli.input {
        MarketSnapshot::from_path(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?
    } else {
        bail!("either --input or --synthetic is required");
    };

    let source = SnapshotSource::new(snapshot, config.breadth.clone())
        .context("failed to load market snapshot")?;

    let pipeline = DailyPipeline::new(config);
    let report = pipeline
        .run(&source, cli.date)
        .context("failed to build daily report")?;

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), date = %report.date, "report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("market_daily=info"));

    // Logs go to stderr so the report can be piped from stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
