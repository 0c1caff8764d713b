//! Command-line entry point.
//!
//! Runs the recall phase and then the latency probe (or the pooled
//! throughput phase) against a live service, printing one JSON report to
//! stdout. Logs go to stderr; set `RUST_LOG` to adjust verbosity.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use annharness::config::RunMode;
use annharness::{Harness, HarnessConfig, SchemaVersion};

#[derive(Parser)]
#[command(name = "annharness")]
#[command(about = "Benchmark and correctness harness for ANN search services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate the service, measure recall@1 and latency, print JSON metrics
    Run {
        /// Path to harness TOML configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Service base URL (overrides config)
        #[arg(long)]
        base_url: Option<String>,

        /// Wire schema: flattened-id, query-matches or ranked
        #[arg(long)]
        schema: Option<SchemaVersion>,

        /// Seed for reproducible datasets and probe queries
        #[arg(short, long)]
        seed: Option<u64>,

        /// Run the probe through a pool of N workers instead of sequentially
        #[arg(long)]
        pooled_workers: Option<usize>,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    DefaultConfig,

    /// List supported wire schemas
    Schemas,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            base_url,
            schema,
            seed,
            pooled_workers,
            output,
        } => {
            let mut cfg = match &config {
                Some(path) => HarnessConfig::load(path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?,
                None => HarnessConfig::default(),
            };

            if let Some(url) = base_url {
                cfg.base_url = url;
            }
            if let Some(schema) = schema {
                cfg.schema = schema;
            }
            if let Some(seed) = seed {
                cfg.dataset.seed = Some(seed);
            }
            if let Some(workers) = pooled_workers {
                cfg.mode = RunMode::Pooled { workers };
            }

            run(cfg, output)
        }
        Commands::DefaultConfig => {
            let toml = toml::to_string_pretty(&HarnessConfig::default())
                .context("Failed to serialize default config")?;
            print!("{toml}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schemas => {
            for schema in SchemaVersion::ALL {
                let note = if schema.sends_k() { "sends k" } else { "k applied client-side" };
                println!("{:<14} {note}", schema.as_str());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(config: HarnessConfig, output: Option<PathBuf>) -> Result<ExitCode> {
    tracing::info!(
        base_url = %config.base_url,
        schema = %config.schema,
        size = config.dataset.size,
        dimension = config.dataset.dimension,
        "starting harness"
    );

    let mut harness = Harness::from_config(config).context("Invalid harness configuration")?;
    let report = harness.run().context("Harness run failed")?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("Failed to write report")?;

    if let Some(path) = output {
        std::fs::write(&path, &json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    if report.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
