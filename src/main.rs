//! Rowfan CLI: run a command in parallel; --query/--table stream rows
//! between the workers and a SQLite database.

use anyhow::Result;
use clap::Parser;
use rowfan::engine::Cli;
use rowfan::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
