//! Fan-out and fan-in: spawn the collaborator processes around the workers.
//!
//! Collaborators are hidden subcommands of this same binary, launched via
//! `current_exe()`. Each does its own blocking FIFO opens, so spawn order
//! here only has to follow the sink-most-first rule of the overall topology
//! (workers already running by the time either fan side starts).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use crate::error::RunError;
use crate::types::{Format, Role};

use super::supervisor::Supervisor;

/// Spawn the unload side: unloader writing the intermediates, then the
/// multiplexer redistributing them onto the worker input pipes. Both join
/// the `unload` role group.
pub fn spawn_fan_out(
    sup: &mut Supervisor,
    db: &Path,
    query: &str,
    format: Format,
    fan_out_pipes: &[PathBuf],
    worker_in_pipes: &[PathBuf],
) -> Result<()> {
    let mut unload = self_command("unload")?;
    unload
        .arg("--db")
        .arg(db)
        .arg("--query")
        .arg(query)
        .arg("--format")
        .arg(format.as_str())
        .args(fan_out_pipes);
    sup.track(
        Role::Unload,
        "unloader".into(),
        None,
        spawn(unload, "unloader")?,
    );

    let mut mux = self_command("mux")?;
    mux.arg("--input")
        .args(fan_out_pipes)
        .arg("--output")
        .args(worker_in_pipes);
    sup.track(
        Role::Unload,
        "fan-out mux".into(),
        None,
        spawn(mux, "fan-out mux")?,
    );
    Ok(())
}

/// Spawn the load side: multiplexer merging worker output pipes onto the
/// intermediates, then the loader draining them into the sink table. Both
/// join the `load` role group.
pub fn spawn_fan_in(
    sup: &mut Supervisor,
    db: &Path,
    table: &str,
    format: Format,
    worker_out_pipes: &[PathBuf],
    fan_in_pipes: &[PathBuf],
) -> Result<()> {
    let mut mux = self_command("mux")?;
    mux.arg("--input")
        .args(worker_out_pipes)
        .arg("--output")
        .args(fan_in_pipes);
    sup.track(
        Role::Load,
        "fan-in mux".into(),
        None,
        spawn(mux, "fan-in mux")?,
    );

    let mut load = self_command("load")?;
    load.arg("--db")
        .arg(db)
        .arg("--table")
        .arg(table)
        .arg("--format")
        .arg(format.as_str())
        .args(fan_in_pipes);
    sup.track(Role::Load, "loader".into(), None, spawn(load, "loader")?);
    Ok(())
}

fn self_command(subcommand: &str) -> Result<Command> {
    let exe = std::env::current_exe().context("locate own executable")?;
    let mut cmd = Command::new(exe);
    cmd.arg(subcommand);
    Ok(cmd)
}

fn spawn(mut cmd: Command, label: &str) -> Result<Child> {
    cmd.spawn().map_err(|e| {
        RunError::Spawn {
            label: label.to_string(),
            source: e,
        }
        .into()
    })
}
