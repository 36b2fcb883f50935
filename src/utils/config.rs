//! Application configuration constants and environment overrides.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    workspace_prefix: String,
    probe_pipe_name: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                workspace_prefix: format!(".{pkg}_pipes"),
                probe_pipe_name: format!(".{pkg}_probe"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Prefix for the per-run pipe workspace directory name.
    pub fn workspace_prefix(&self) -> &str {
        &self.workspace_prefix
    }

    /// Name of the throwaway FIFO used to probe a candidate directory.
    pub fn probe_pipe_name(&self) -> &str {
        &self.probe_pipe_name
    }
}

// ---- Environment overrides ----

/// Environment variable names. Each overrides the matching default when the
/// CLI flag is absent; the CLI flag always wins.
pub struct EnvVars;

impl EnvVars {
    pub const JOBS: &'static str = "ROWFAN_JOBS";
    pub const PARALLEL_UNLOADS: &'static str = "ROWFAN_PARALLEL_UNLOADS";
    pub const PARALLEL_LOADS: &'static str = "ROWFAN_PARALLEL_LOADS";
    pub const PIPE_DIR: &'static str = "ROWFAN_PIPE_DIR";
    pub const FORMAT: &'static str = "ROWFAN_FORMAT";
    /// Set in each worker's environment: 1-based ordinal.
    pub const WORKER_ID: &'static str = "ROWFAN_WORKER_ID";
    /// Set in each worker's environment: total worker count.
    pub const WORKER_COUNT: &'static str = "ROWFAN_WORKER_COUNT";
}

/// Read an env var and parse it; `None` when unset, empty, or unparseable
/// (unparseable values are logged and ignored, not fatal).
pub fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

/// Default worker count: available processors minus one, floor 1.
pub fn default_num_processes() -> usize {
    rayon::current_num_threads().saturating_sub(1).max(1)
}

// ---- Loading ----

/// Batch size for sink INSERT transactions (balance transaction size vs round-trips).
pub const DB_INSERT_BATCH_SIZE: usize = 1000;

// ---- Multiplexer / loader channels ----

/// Bounded channel capacity between pipe reader threads and writer/insert
/// threads. Bounded so a fast producer cannot outrun a slow consumer by more
/// than this many records (capacity-fair under blocking I/O).
pub const FAN_CHANNEL_CAP: usize = 8192;

// ---- Defaults ----

/// Defaults for the counts that are configurable via flag or environment.
pub struct RunDefaults;

impl RunDefaults {
    pub const PARALLEL_UNLOADS: usize = 1;
    pub const PARALLEL_LOADS: usize = 1;
}
