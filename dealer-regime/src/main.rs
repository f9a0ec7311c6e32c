//! # Analyze one snapshot
//! dealer-regime analyze --snapshot data/snapshots/SPY.json --pretty
//!
//! # Analyze every snapshot in a directory
//! dealer-regime batch --dir data/snapshots --config config/default.toml
//!
//! # Print the default configuration
//! dealer-regime config > config/default.toml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use dealer_regime::{load_config, AnalysisConfig, RegimeAnalyzer, SnapshotLoader};

#[derive(Parser)]
#[command(name = "dealer-regime")]
#[command(about = "Dealer gamma regime detection and trade thesis classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single snapshot and print the report as JSON
    Analyze {
        /// Path to snapshot JSON file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Analyze every snapshot in a directory in parallel
    Batch {
        /// Directory of snapshot JSON files
        #[arg(short, long, default_value = "data/snapshots")]
        dir: PathBuf,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn analyzer(config: Option<PathBuf>) -> Result<RegimeAnalyzer> {
    let config = match config {
        Some(path) => load_config(&path).with_context(|| format!("Invalid config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    Ok(RegimeAnalyzer::new(config)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("dealer_regime=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            snapshot,
            config,
            pretty,
        } => {
            let analyzer = analyzer(config)?;
            let snapshot = SnapshotLoader::load_file(&snapshot)
                .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
            let report = analyzer.analyze(&snapshot);
            info!("{}", report.summary());

            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
        Commands::Batch { dir, config } => {
            let analyzer = analyzer(config)?;
            let snapshots = SnapshotLoader::new(&dir)
                .load_all()
                .with_context(|| format!("Failed to load snapshots from {}", dir.display()))?;
            if snapshots.is_empty() {
                warn!("No snapshots found in {}", dir.display());
                return Ok(());
            }

            for report in analyzer.analyze_batch(&snapshots) {
                info!("{}", report.summary());
            }
        }
        Commands::Config => {
            print!("{}", AnalysisConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}
