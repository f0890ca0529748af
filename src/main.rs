use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use herdbook::{
    analysis::calculate_animal_value,
    compare_snapshots,
    web::{self, WebServerConfig},
    DashboardConfig, DataSource, FarmSnapshot, SnapshotLoader, SnapshotWriter,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Livestock herd dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest a snapshot and print pasture summaries
    Report {
        /// Path to the dashboard YAML config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Snapshot JSON file (overrides the config)
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write the derived state under the configured export directory
        #[arg(long)]
        export: bool,
    },
    /// Print the change set between two snapshots as JSON
    Diff { old: PathBuf, new: PathBuf },
    /// Print one animal's valuation with its breakdown
    Value { snapshot: PathBuf, animal_id: String },
    /// Serve the dashboard API, polling the configured snapshot
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::from_yaml(path),
        None => Ok(DashboardConfig::default()),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();
}

/// `source` overrides the data source recorded in the export, when given.
fn ingest(path: &Path, source: Option<DataSource>) -> Result<FarmSnapshot> {
    let mut raw = SnapshotLoader::new(".").load(path)?;
    if let Some(source) = source {
        raw.source = source;
    }
    FarmSnapshot::from_raw(&raw).with_context(|| format!("Failed to ingest {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Report {
            config,
            snapshot,
            export,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.logging.level);
            let path = snapshot.unwrap_or_else(|| PathBuf::from(&config.snapshot.path));
            let farm = ingest(&path, Some(config.snapshot.source))?;
            print_report(&config.name, &farm);
            if export {
                let written =
                    SnapshotWriter::new(&config.snapshot.export_dir).write(&config.name, &farm)?;
                println!("Exported derived state to {}", written.display());
            }
        }
        Command::Diff { old, new } => {
            init_tracing("warn");
            let changes = compare_snapshots(&ingest(&old, None)?, &ingest(&new, None)?)?;
            println!("{}", serde_json::to_string_pretty(&changes)?);
        }
        Command::Value {
            snapshot,
            animal_id,
        } => {
            init_tracing("warn");
            let farm = ingest(&snapshot, None)?;
            let animal = farm
                .animal(&animal_id)
                .with_context(|| format!("No animal with id '{animal_id}'"))?;
            let valuation = calculate_animal_value(animal);
            println!(
                "{} ({}): {}",
                animal.display_name(),
                animal.sub_type,
                valuation.value
            );
            println!("{}", serde_json::to_string_pretty(&valuation.breakdown)?);
        }
        Command::Serve { config, host, port } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.logging.level);
            info!(dashboard = %config.name, snapshot = %config.snapshot.path, "starting server");
            web::run(WebServerConfig {
                name: config.name.clone(),
                snapshot_path: PathBuf::from(&config.snapshot.path),
                source: config.snapshot.source,
                refresh_seconds: config.snapshot.refresh_seconds,
                history: config.notifications.history,
                host: host.unwrap_or(config.server.host),
                port: port.unwrap_or(config.server.port),
            })
            .await?;
        }
    }
    Ok(())
}

fn print_report(name: &str, farm: &FarmSnapshot) {
    let stats = farm.statistics();
    println!(
        "Farm '{}' day {}: {} animals in {} pastures, herd value {}",
        name, farm.game_time.day, stats.total_animals, stats.pasture_count, stats.total_value
    );
    for pasture in &farm.pastures {
        println!(
            "  {:<24} {:>4}/{:<4} animals  health {:>5.1}  value {:>8}  warnings {}",
            pasture.name,
            pasture.animal_count,
            pasture.capacity,
            pasture.avg_health,
            pasture.total_value(),
            pasture.all_warnings.len()
        );
        for warning in &pasture.all_warnings {
            println!("      [{:?}] {}", warning.severity, warning.message);
        }
    }
}
