//! `sna` command line.
//!
//! Usage:
//!   `sna analyze ./graph.txt`
//!   `sna analyze ./graph.snap --snapshot --quiet --json`
//!   `sna convert ./graph.txt ./graph.snap`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sna_cli::{analyze, GraphSource};
use sna_core::config::AppConfig;
use std::path::PathBuf;
use storage::loader::load_edge_list;
use storage::snapshot::write_snapshot;
use tracing::info;

#[derive(Parser)]
#[command(name = "sna")]
#[command(author, version, about = "Social network analysis over an in-memory graph")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole algorithm suite and print a report
    Analyze {
        /// Edge list (or snapshot with --snapshot)
        path: PathBuf,

        /// Treat PATH as a snapshot file
        #[arg(long)]
        snapshot: bool,

        /// Turn engine logging off
        #[arg(short, long)]
        quiet: bool,

        /// Configuration file layered over the defaults
        #[arg(short, long, env = "SNA_CONFIG")]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a snapshot file from an edge list
    Convert {
        /// Source edge list
        edges: PathBuf,

        /// Destination snapshot
        snapshot: PathBuf,
    },
}

fn main() -> Result<()> {
    sna_core::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            snapshot,
            quiet,
            config,
            json,
        } => {
            let config = match config {
                Some(file) => AppConfig::from_file(&file)
                    .with_context(|| format!("failed to read config {}", file.display()))?,
                None => AppConfig::load().context("failed to load configuration")?,
            };
            let source = if snapshot {
                GraphSource::Snapshot(path)
            } else {
                GraphSource::EdgeList(path)
            };

            let report = analyze(&source, &config, quiet)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Convert { edges, snapshot } => {
            let graph = load_edge_list(&edges)
                .with_context(|| format!("failed to load edge list {}", edges.display()))?;
            write_snapshot(&snapshot, &graph)
                .with_context(|| format!("failed to write snapshot {}", snapshot.display()))?;
            info!(
                "Wrote {} ({} relationships)",
                snapshot.display(),
                graph.edge_count()
            );
        }
    }

    Ok(())
}
