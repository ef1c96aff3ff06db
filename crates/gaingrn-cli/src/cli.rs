use super::commands;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging. Never changes results.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign generic residue numbers to every structure of a manifest.
    Index(IndexArgs),
    /// Show the segments and subdomain boundary detected in one STRIDE file.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// JSON manifest listing the structures to index
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// JSON template library
    #[arg(short, long)]
    pub templates: PathBuf,

    /// JSON indexer configuration; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Label table (CSV), one row per structure
    #[arg(short, long)]
    pub output: PathBuf,

    /// Per-label occupancy and consensus table (CSV)
    #[arg(long)]
    pub occupancy: Option<PathBuf>,

    /// Directory for per-structure long-format files
    #[arg(long)]
    pub long_dir: Option<PathBuf>,

    /// Merge repeated elements into the primary columns
    #[arg(long)]
    pub unique_sse: bool,

    /// Write `L428` instead of `L` in table cells
    #[arg(long)]
    pub numbered: bool,

    #[arg(long)]
    pub threads: Option<usize>,

    /// Keep generic labels on the GPS residues
    #[arg(long)]
    pub no_gps: bool,

    /// Run this GESAMT binary instead of reading the manifest's alignments
    #[arg(long)]
    pub gesamt: Option<PathBuf>,

    /// Seconds allowed per GESAMT run
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(short, long)]
    pub stride: PathBuf,

    /// Subdomain boundary residue; detected when absent
    #[arg(long)]
    pub boundary: Option<i32>,

    /// Coordinates to compare the STRIDE sequence against
    #[arg(long)]
    pub pdb: Option<PathBuf>,

    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Index(args) => commands::index::execute(args, self.debug),
            Commands::Inspect(args) => commands::inspect::execute(args, self.debug),
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` when requested.
pub fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
