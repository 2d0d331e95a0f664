//! Scenario replay binary

use anyhow::Context;
use clap::{Parser, ValueEnum};
use ledger_invariants::{
    ArithmeticMode, EngineConfig, LedgerEngine, Metrics, Scenario, ScenarioRunner,
};
use prometheus::{Encoder, TextEncoder};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Arithmetic {
    Checked,
    Wrapping,
}

impl From<Arithmetic> for ArithmeticMode {
    fn from(value: Arithmetic) -> Self {
        match value {
            Arithmetic::Checked => ArithmeticMode::Checked,
            Arithmetic::Wrapping => ArithmeticMode::Wrapping,
        }
    }
}

/// Replay a ledger scenario and report invariant drift
#[derive(Debug, Parser)]
#[command(name = "drift-replay", version, about)]
struct Cli {
    /// Scenario file (.toml or .json)
    scenario: PathBuf,

    /// Override the arithmetic mode of the scenario
    #[arg(long, value_enum)]
    arithmetic: Option<Arithmetic>,

    /// Engine config file (TOML); defaults to DRIFT_* environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Dump Prometheus metrics to stderr after the replay
    #[arg(long)]
    metrics: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::from_env().context("reading DRIFT_* environment")?,
    };

    let mut scenario = Scenario::from_file(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;

    let mut config = scenario.engine_config(&base);
    if let Some(arithmetic) = cli.arithmetic {
        config.arithmetic = arithmetic.into();
    }
    scenario.engine = Some(config.clone());

    let metrics = Metrics::new().context("registering metrics")?;
    let runner = ScenarioRunner::new(LedgerEngine::new(&config)).with_metrics(metrics.clone());
    let result = runner
        .run_scenario(&scenario)
        .with_context(|| format!("replaying scenario {}", scenario.name))?;

    match cli.format {
        OutputFormat::Text => {
            println!("scenario: {} ({})", scenario.name, config.arithmetic);
            if let Some(description) = &scenario.description {
                println!("{}", description);
            }
            println!("{}", result);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    if cli.metrics {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metrics.registry().gather(), &mut buffer)
            .context("encoding metrics")?;
        eprint!("{}", String::from_utf8_lossy(&buffer));
    }

    Ok(())
}
