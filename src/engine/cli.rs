//! CLI dispatch: fold flags + environment into `Opts` once, then run.

use anyhow::{Context, Result, bail};
use log::debug;

use crate::collab;
use crate::types::Opts;
use crate::utils::config::{EnvVars, RunDefaults, default_num_processes, env_parsed};
use crate::utils::setup_logging;

use super::arg_parser::{Cli, Helper};
use super::core::run_parallel;

/// Build run options from CLI flags, environment overrides, and defaults.
/// Precedence: flag, then ROWFAN_* variable, then default.
pub fn setup_opts(cli: &Cli) -> Result<Opts> {
    let verbose = cli.verbose.unwrap_or(false);
    setup_logging(verbose);
    // Optional .env next to the invocation can supply the ROWFAN_* overrides.
    let _ = dotenvy::dotenv();

    let Some(command) = cli.command.clone() else {
        bail!("--command is required");
    };
    if (cli.query.is_some() || cli.table.is_some()) && cli.db.is_none() {
        bail!("--db is required when --query or --table is given");
    }

    Ok(Opts {
        command,
        query: cli.query.clone(),
        table: cli.table.clone(),
        db_path: cli.db.clone(),
        num_processes: cli
            .jobs
            .or_else(|| env_parsed(EnvVars::JOBS))
            .unwrap_or_else(default_num_processes),
        parallel_unloads: cli
            .parallel_unloads
            .or_else(|| env_parsed(EnvVars::PARALLEL_UNLOADS))
            .unwrap_or(RunDefaults::PARALLEL_UNLOADS),
        parallel_loads: cli
            .parallel_loads
            .or_else(|| env_parsed(EnvVars::PARALLEL_LOADS))
            .unwrap_or(RunDefaults::PARALLEL_LOADS),
        pipe_dir: match cli.pipe_dir.clone().or_else(|| env_parsed(EnvVars::PIPE_DIR)) {
            Some(dir) => dir,
            None => std::env::current_dir().context("resolve current directory")?,
        },
        format: cli
            .format
            .or_else(|| env_parsed(EnvVars::FORMAT))
            .unwrap_or_default(),
        verbose,
    })
}

/// Entry point for the binary: run the orchestrator, or one of the hidden
/// collaborator subcommands when spawned against ourselves.
pub fn handle_run(cli: &Cli) -> Result<()> {
    match &cli.helper {
        Some(Helper::Unload(a)) => {
            setup_logging(false);
            collab::unload::run(&collab::unload::UnloadArgs {
                db: a.db.clone(),
                query: a.query.clone(),
                format: a.format,
                pipes: a.pipes.clone(),
            })
        }
        Some(Helper::Load(a)) => {
            setup_logging(false);
            collab::load::run(&collab::load::LoadArgs {
                db: a.db.clone(),
                table: a.table.clone(),
                format: a.format,
                pipes: a.pipes.clone(),
            })
        }
        Some(Helper::Mux(a)) => {
            setup_logging(false);
            collab::mux::run(&collab::mux::MuxArgs {
                inputs: a.inputs.clone(),
                outputs: a.outputs.clone(),
            })
        }
        None => {
            let opts = setup_opts(cli)?;
            debug!("running: {}", opts.command);
            run_parallel(&opts)
        }
    }
}
