//! Pipe workspace: a private directory for the run's named pipes.
//!
//! Candidate locations are probed in order with a real mkfifo (writability
//! alone is not enough; some filesystems refuse FIFOs). The workspace is a
//! freshly created subdirectory so concurrent runs never collide, and it is
//! removed on every exit path: `Drop` covers normal and error returns, the
//! signal handler covers external termination.

use log::{debug, warn};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RunError;
use crate::utils::config::PackagePaths;

/// Exclusively-owned pipe directory. Holds the paths of every FIFO it made.
#[derive(Debug)]
pub struct PipeWorkspace {
    dir: PathBuf,
    pipes: Vec<PathBuf>,
    destroyed: bool,
}

impl PipeWorkspace {
    /// Probe `candidates` in order; bind to a fresh subdirectory under the
    /// first one where a FIFO can actually be created.
    pub fn create(candidates: &[PathBuf]) -> Result<Self, RunError> {
        for cand in candidates {
            match Self::try_candidate(cand) {
                Ok(dir) => {
                    debug!("pipe workspace: {}", dir.display());
                    return Ok(PipeWorkspace {
                        dir,
                        pipes: Vec::new(),
                        destroyed: false,
                    });
                }
                Err(e) => {
                    debug!("pipe location {} rejected: {}", cand.display(), e);
                }
            }
        }
        Err(RunError::NoWritablePipeLocation {
            tried: candidates.to_vec(),
        })
    }

    /// Default candidate order: configured dir, then home, then temp.
    pub fn default_candidates(configured: &Path) -> Vec<PathBuf> {
        let mut cands = vec![configured.to_path_buf()];
        if let Some(home) = std::env::home_dir() {
            cands.push(home);
        }
        cands.push(std::env::temp_dir());
        cands
    }

    fn try_candidate(cand: &Path) -> std::io::Result<PathBuf> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let dir = cand.join(format!(
            "{}.{}.{}",
            PackagePaths::get().workspace_prefix(),
            std::process::id(),
            nanos
        ));
        std::fs::create_dir(&dir)?;
        // Writable is not enough; the filesystem must take a FIFO.
        let probe = dir.join(PackagePaths::get().probe_pipe_name());
        if let Err(e) = mkfifo(&probe) {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }
        let _ = std::fs::remove_file(&probe);
        Ok(dir)
    }

    /// Workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create one FIFO per name inside the workspace; returns full paths in
    /// the same order.
    pub fn make_pipes<'a>(
        &mut self,
        names: impl Iterator<Item = &'a str>,
    ) -> std::io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for name in names {
            let path = self.dir.join(name);
            mkfifo(&path)?;
            self.pipes.push(path.clone());
            paths.push(path);
        }
        debug!("created {} named pipes", paths.len());
        Ok(paths)
    }

    /// Remove the workspace. Idempotent; failures are logged, never raised
    /// (the run's result is already determined by the time this runs).
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove pipe workspace {}: {}", self.dir.display(), e);
            }
        }
    }
}

impl Drop for PipeWorkspace {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Create a named pipe (mode 0600). Raw libc since std has no mkfifo.
pub fn mkfifo(path: &Path) -> std::io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
    if unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
