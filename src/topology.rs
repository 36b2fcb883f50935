//! Topology planning: pure mapping from (source, sink) presence to the
//! execution mode and the set of named pipes a run needs.

use std::path::{Path, PathBuf};

use crate::types::ExecutionMode;

/// Pipe file names a run needs, relative to the workspace directory.
/// Worker pipe counts always equal the worker count; intermediate pipe
/// counts are configured independently.
#[derive(Clone, Debug, Default)]
pub struct TopologyPlan {
    /// One stdin pipe per worker (present iff a source query is given).
    pub worker_in: Vec<String>,
    /// One stdout pipe per worker (present iff a sink table is given).
    pub worker_out: Vec<String>,
    /// Intermediate pipes between the unloader and the fan-out multiplexer.
    pub fan_out: Vec<String>,
    /// Intermediate pipes between the fan-in multiplexer and the loader.
    pub fan_in: Vec<String>,
}

impl TopologyPlan {
    /// All pipe names, in creation order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.worker_in
            .iter()
            .chain(&self.worker_out)
            .chain(&self.fan_out)
            .chain(&self.fan_in)
            .map(String::as_str)
    }

    /// Total number of pipes the run needs.
    pub fn pipe_count(&self) -> usize {
        self.worker_in.len() + self.worker_out.len() + self.fan_out.len() + self.fan_in.len()
    }

    /// Resolve a list of pipe names against the workspace directory.
    pub fn resolve(dir: &Path, names: &[String]) -> Vec<PathBuf> {
        names.iter().map(|n| dir.join(n)).collect()
    }
}

/// Plan the pipes for `mode`. Standalone runs need no pipes at all.
pub fn plan(
    mode: ExecutionMode,
    num_processes: usize,
    parallel_unloads: usize,
    parallel_loads: usize,
) -> TopologyPlan {
    let mut plan = TopologyPlan::default();
    if mode.pipes_stdin() {
        plan.worker_in = (1..=num_processes).map(|i| format!("in.{i}")).collect();
        plan.fan_out = (1..=parallel_unloads)
            .map(|k| format!("unload.{k}"))
            .collect();
    }
    if mode.pipes_stdout() {
        plan.worker_out = (1..=num_processes).map(|i| format!("out.{i}")).collect();
        plan.fan_in = (1..=parallel_loads).map(|k| format!("load.{k}")).collect();
    }
    plan
}
