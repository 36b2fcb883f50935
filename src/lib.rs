//! Rowfan: run a command N ways in parallel, streaming rows between a
//! SQLite database and the workers over named pipes.

pub mod collab;
pub mod engine;
pub mod error;
pub mod topology;
pub mod types;
pub mod utils;
pub mod workspace;

/// Re-export types for API
pub use error::RunError;
pub use types::*;

use log::debug;

/// Result alias used by public rowfan API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: run `opts.command` across `opts.num_processes`
/// workers, fanning source rows out to their stdin when `opts.query` is set
/// and collecting their stdout into `opts.table` when that is set.
///
/// Blocks until every spawned process has been reaped. On any failure the
/// whole process set is terminated and the first failure (in unload,
/// command, load order) is returned; the pipe workspace is removed on every
/// exit path.
pub fn run(opts: &Opts) -> Result<()> {
    utils::setup_logging(opts.verbose);
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);
    engine::run_parallel(opts)
}
