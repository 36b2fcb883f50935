use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::types::Format;

/// Parallel command runner over named pipes.
#[derive(Clone, Parser)]
#[command(name = "rowfan")]
#[command(
    about = "Run a command N ways in parallel, streaming rows between a SQLite database and the workers over named pipes."
)]
pub struct Cli {
    /// Command text to run in every worker (via `sh -c`). The worker's
    /// ordinal is exposed as ROWFAN_WORKER_ID.
    #[arg(long, short = 'c')]
    pub command: Option<String>,

    /// Source query: its rows are fanned out across worker stdin.
    #[arg(long, short = 'q')]
    pub query: Option<String>,

    /// Sink table: worker stdout is collected into it.
    #[arg(long, short = 't')]
    pub table: Option<String>,

    /// SQLite database path. Required with --query or --table.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Worker count. Default: available processors minus one (ROWFAN_JOBS).
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Intermediate fan-out pipe count. Default 1 (ROWFAN_PARALLEL_UNLOADS).
    #[arg(long)]
    pub parallel_unloads: Option<usize>,

    /// Intermediate fan-in pipe count. Default 1 (ROWFAN_PARALLEL_LOADS).
    #[arg(long)]
    pub parallel_loads: Option<usize>,

    /// First candidate directory for the pipe workspace. Default: current
    /// directory (ROWFAN_PIPE_DIR); falls back to home, then temp.
    #[arg(long)]
    pub pipe_dir: Option<PathBuf>,

    /// Wire format between the unloader and the workers (ROWFAN_FORMAT).
    #[arg(long)]
    pub format: Option<Format>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    #[command(subcommand)]
    pub helper: Option<Helper>,
}

/// Collaborator subcommands the orchestrator spawns against its own binary.
/// Hidden: they are an internal wire contract, not user surface.
#[derive(Clone, Subcommand)]
pub enum Helper {
    #[command(hide = true)]
    Unload(UnloadCli),
    #[command(hide = true)]
    Load(LoadCli),
    #[command(hide = true)]
    Mux(MuxCli),
}

#[derive(Clone, Args)]
pub struct UnloadCli {
    #[arg(long)]
    pub db: PathBuf,
    #[arg(long)]
    pub query: String,
    #[arg(long, default_value = "tsv")]
    pub format: Format,
    /// Output pipes the rows are distributed across.
    #[arg(value_name = "PIPE", required = true)]
    pub pipes: Vec<PathBuf>,
}

#[derive(Clone, Args)]
pub struct LoadCli {
    #[arg(long)]
    pub db: PathBuf,
    #[arg(long)]
    pub table: String,
    #[arg(long, default_value = "tsv")]
    pub format: Format,
    /// Input pipes the rows are drained from.
    #[arg(value_name = "PIPE", required = true)]
    pub pipes: Vec<PathBuf>,
}

#[derive(Clone, Args)]
pub struct MuxCli {
    /// Input endpoints.
    #[arg(long = "input", num_args = 1.., required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output endpoints.
    #[arg(long = "output", num_args = 1.., required = true)]
    pub outputs: Vec<PathBuf>,
}
