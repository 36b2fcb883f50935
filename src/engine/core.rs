//! Core orchestration: workspace → topology → spawn → supervise → cleanup.
//!
//! Spawn order works from the sink-most processes toward the source-most
//! ones (workers, then the load side, then the unload side), so that by the
//! time an upstream process opens a pipe for writing, a ready reader already
//! exists. Wait order is the reverse concern and lives in the supervisor.

use anyhow::{Context, Result, ensure};
use log::{debug, info};
use std::sync::Arc;

use crate::topology::{self, TopologyPlan};
use crate::types::{ExecutionMode, Opts};
use crate::utils::cancel;
use crate::workspace::PipeWorkspace;

use super::fan::{spawn_fan_in, spawn_fan_out};
use super::pool::spawn_workers;
use super::supervisor::Supervisor;

/// Run `opts.command` across the pool, wiring the optional source and sink
/// streams through named pipes. Returns only when every tracked process has
/// been reaped; the pipe workspace is gone on every exit path.
pub fn run_parallel(opts: &Opts) -> Result<()> {
    ensure!(!opts.command.trim().is_empty(), "command must not be empty");
    ensure!(opts.num_processes >= 1, "need at least one worker");
    ensure!(
        opts.parallel_unloads >= 1 && opts.parallel_loads >= 1,
        "parallel unload/load counts must be at least 1"
    );
    if opts.query.is_some() || opts.table.is_some() {
        ensure!(
            opts.db_path.is_some(),
            "a database path is required when a query or table is given"
        );
    }

    let mode = opts.mode();
    debug!(
        "mode {:?}: {} workers, {} unload pipes, {} load pipes",
        mode, opts.num_processes, opts.parallel_unloads, opts.parallel_loads
    );

    let plan = topology::plan(
        mode,
        opts.num_processes,
        opts.parallel_unloads,
        opts.parallel_loads,
    );

    let cancel = cancel::install();

    let mut ws = if mode == ExecutionMode::Standalone {
        None
    } else {
        let candidates = PipeWorkspace::default_candidates(&opts.pipe_dir);
        let mut ws = PipeWorkspace::create(&candidates)?;
        cancel.lock().unwrap().workspace = Some(ws.dir().to_path_buf());
        ws.make_pipes(plan.all_names())
            .context("create named pipes")?;
        Some(ws)
    };

    let (worker_in, worker_out, fan_out, fan_in) = match &ws {
        Some(ws) => (
            TopologyPlan::resolve(ws.dir(), &plan.worker_in),
            TopologyPlan::resolve(ws.dir(), &plan.worker_out),
            TopologyPlan::resolve(ws.dir(), &plan.fan_out),
            TopologyPlan::resolve(ws.dir(), &plan.fan_in),
        ),
        None => Default::default(),
    };

    let mut sup = Supervisor::new(Arc::clone(&cancel));
    let spawned = (|| -> Result<()> {
        spawn_workers(&mut sup, opts, &worker_in, &worker_out)?;
        if let Some(table) = &opts.table {
            let db = opts.db_path.as_ref().context("database path missing")?;
            spawn_fan_in(&mut sup, db, table, opts.format, &worker_out, &fan_in)?;
        }
        if let Some(query) = &opts.query {
            let db = opts.db_path.as_ref().context("database path missing")?;
            spawn_fan_out(&mut sup, db, query, opts.format, &fan_out, &worker_in)?;
        }
        Ok(())
    })();
    if let Err(e) = spawned {
        // Partial pool: nothing may keep running unsupervised.
        sup.terminate_all();
        sup.reap_all();
        if let Some(ws) = ws.as_mut() {
            ws.destroy();
        }
        cancel::clear(&cancel);
        return Err(e);
    }

    let result = sup.wait_all();
    if let Some(ws) = ws.as_mut() {
        ws.destroy();
    }
    cancel::clear(&cancel);
    result?;
    info!("all {} workers finished", opts.num_processes);
    Ok(())
}
