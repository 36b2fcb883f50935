//! Fatal failure taxonomy for a run.
//!
//! Everything here aborts the run; there are no retries. Cleanup problems
//! (workspace removal) are logged warnings, never variants of this enum.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Pre-flight: no candidate directory accepted a named-pipe probe.
    #[error("no writable location for named pipes (tried: {})", format_tried(.tried))]
    NoWritablePipeLocation { tried: Vec<PathBuf> },

    /// A process failed to start. Aborts before any waiting; siblings that
    /// did start are terminated by the caller.
    #[error("failed to spawn {label}: {source}")]
    Spawn {
        label: String,
        source: std::io::Error,
    },

    /// A worker exited non-zero (or on a signal). `index` is the 1-based ordinal.
    #[error("worker {index} failed: {status}")]
    WorkerFailure { index: usize, status: ExitStatus },

    /// The unloader or the fan-out multiplexer exited non-zero.
    #[error("unload failed ({label}): {status}")]
    UnloadFailure { label: String, status: ExitStatus },

    /// The loader or the fan-in multiplexer exited non-zero.
    #[error("load failed ({label}): {status}")]
    LoadFailure { label: String, status: ExitStatus },
}

fn format_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
