//! Process supervision: role groups, ordered waiting, broadcast termination.
//!
//! The wait order is unload, then command, then load — never arbitrary. If
//! the unloader dies first, the workers sit blocked on stdin pipes that will
//! never close; waiting on the upstream-most role first detects the failure
//! before blocking on a process that can hang forever. Within a role, waits
//! happen in spawn order.

use anyhow::Result;
use log::{debug, warn};
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex};

use crate::error::RunError;
use crate::types::Role;
use crate::utils::cancel::CancelState;

/// One tracked process. `ordinal` is set for workers (1-based).
pub struct Supervised {
    pub label: String,
    pub ordinal: Option<usize>,
    pub child: Child,
}

/// Holds every spawned process, grouped by role. An empty group is simply
/// never waited on.
pub struct Supervisor {
    unload: Vec<Supervised>,
    command: Vec<Supervised>,
    load: Vec<Supervised>,
    cancel: Arc<Mutex<CancelState>>,
}

impl Supervisor {
    pub fn new(cancel: Arc<Mutex<CancelState>>) -> Self {
        Supervisor {
            unload: Vec::new(),
            command: Vec::new(),
            load: Vec::new(),
            cancel,
        }
    }

    /// Track a freshly spawned process under `role`. Also registers its pid
    /// with the Ctrl+C handler.
    pub fn track(&mut self, role: Role, label: String, ordinal: Option<usize>, child: Child) {
        debug!("spawned {} (pid {})", label, child.id());
        self.cancel.lock().unwrap().pids.push(child.id() as i32);
        self.group_mut(role).push(Supervised {
            label,
            ordinal,
            child,
        });
    }

    fn group_mut(&mut self, role: Role) -> &mut Vec<Supervised> {
        match role {
            Role::Unload => &mut self.unload,
            Role::Command => &mut self.command,
            Role::Load => &mut self.load,
        }
    }

    /// Wait for every process in role order. On the first non-zero exit,
    /// terminate everything, reap, and return the structured failure; later
    /// failures among terminated siblings are suppressed. Ends with an
    /// unconditional reap on both paths.
    pub fn wait_all(&mut self) -> Result<()> {
        let mut failure: Option<RunError> = None;
        'roles: for role in [Role::Unload, Role::Command, Role::Load] {
            for idx in 0..self.group_mut(role).len() {
                let proc = &mut self.group_mut(role)[idx];
                let status = proc
                    .child
                    .wait()
                    .map_err(|e| anyhow::anyhow!("wait on {}: {}", proc.label, e))?;
                if status.success() {
                    debug!("{} finished", proc.label);
                    continue;
                }
                failure = Some(failure_for(role, proc, status));
                break 'roles;
            }
        }
        if let Some(err) = failure {
            self.terminate_all();
            self.reap_all();
            return Err(err.into());
        }
        self.reap_all();
        Ok(())
    }

    /// SIGTERM every tracked process. Idempotent: already-exited pids just
    /// produce ESRCH, which is ignored.
    pub fn terminate_all(&mut self) {
        for proc in self
            .unload
            .iter()
            .chain(&self.command)
            .chain(&self.load)
        {
            let rc = unsafe { libc::kill(proc.child.id() as i32, libc::SIGTERM) };
            if rc != 0 {
                let e = std::io::Error::last_os_error();
                if e.raw_os_error() != Some(libc::ESRCH) {
                    warn!("could not signal {}: {}", proc.label, e);
                }
            }
        }
    }

    /// Reap every process, ignoring statuses. Safe to call after `wait_all`
    /// (an already-waited child reports its cached status).
    pub fn reap_all(&mut self) {
        for proc in self
            .unload
            .iter_mut()
            .chain(&mut self.command)
            .chain(&mut self.load)
        {
            let _ = proc.child.wait();
        }
    }
}

fn failure_for(role: Role, proc: &Supervised, status: ExitStatus) -> RunError {
    match role {
        Role::Unload => RunError::UnloadFailure {
            label: proc.label.clone(),
            status,
        },
        Role::Command => RunError::WorkerFailure {
            index: proc.ordinal.unwrap_or(0),
            status,
        },
        Role::Load => RunError::LoadFailure {
            label: proc.label.clone(),
            status,
        },
    }
}
