//! Worker pool: N parallel executions of the user's command text.
//!
//! Redirection to the named pipes happens inside each child shell, so the
//! blocking FIFO opens never run in the orchestrator. The command text is
//! wrapped in a brace group (`{ …\n}`) rather than `exec`'d so pipelines and
//! compound commands redirect correctly too.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RunError;
use crate::types::{Opts, Role};
use crate::utils::config::EnvVars;

use super::supervisor::Supervisor;

/// Spawn the full pool. Each worker gets a distinct 1-based ordinal in its
/// environment and its stdin/stdout bound per the mode table. A failed spawn
/// aborts immediately; the caller terminates the siblings already tracked.
pub fn spawn_workers(
    sup: &mut Supervisor,
    opts: &Opts,
    in_pipes: &[PathBuf],
    out_pipes: &[PathBuf],
) -> Result<()> {
    let mode = opts.mode();
    debug!(
        "spawning {} workers in {:?} mode",
        opts.num_processes, mode
    );
    for i in 1..=opts.num_processes {
        let stdin_pipe = mode.pipes_stdin().then(|| in_pipes[i - 1].as_path());
        let stdout_pipe = mode.pipes_stdout().then(|| out_pipes[i - 1].as_path());
        let script = worker_script(&opts.command, stdin_pipe, stdout_pipe);
        let label = format!("worker {i}");

        let child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .env(EnvVars::WORKER_ID, i.to_string())
            .env(EnvVars::WORKER_COUNT, opts.num_processes.to_string())
            .spawn()
            .map_err(|e| RunError::Spawn {
                label: label.clone(),
                source: e,
            })?;
        sup.track(Role::Command, label, Some(i), child);
    }
    Ok(())
}

/// Shell text for one worker: the command in a brace group with its pipe
/// redirections, or the bare command when both streams are inherited.
pub fn worker_script(
    command: &str,
    stdin_pipe: Option<&Path>,
    stdout_pipe: Option<&Path>,
) -> String {
    if stdin_pipe.is_none() && stdout_pipe.is_none() {
        return command.to_string();
    }
    let mut script = format!("{{\n{command}\n}}");
    if let Some(p) = stdin_pipe {
        script.push_str(&format!(" < {}", sh_quote(p)));
    }
    if let Some(p) = stdout_pipe {
        script.push_str(&format!(" > {}", sh_quote(p)));
    }
    script
}

/// Single-quote a path for the shell. Workspace paths are machine-generated
/// but the candidate directory underneath them is not.
pub fn sh_quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    format!("'{}'", s.replace('\'', r"'\''"))
}
