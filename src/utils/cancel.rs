//! Interrupt handling: terminate every tracked child and remove the pipe
//! workspace before exiting, so an interrupted run leaves nothing behind.
//! The `termination` feature of ctrlc extends the handler beyond SIGINT to
//! SIGTERM and SIGHUP, so an external kill cleans up the same way.
//!
//! The handler is installed once per process; the state it reads is swapped
//! per run, so library callers can run more than once.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

/// Shared between the orchestrator and the signal handler.
#[derive(Default)]
pub struct CancelState {
    /// Pids of every tracked child, appended as they spawn.
    pub pids: Vec<i32>,
    /// Workspace directory to remove on interrupt.
    pub workspace: Option<PathBuf>,
}

static CANCEL_STATE: OnceLock<Arc<Mutex<CancelState>>> = OnceLock::new();

fn state() -> &'static Arc<Mutex<CancelState>> {
    CANCEL_STATE.get_or_init(|| Arc::new(Mutex::new(CancelState::default())))
}

/// Install the handler (first call only) and reset the shared state for a
/// new run. Returns the state handle the supervisor appends pids to.
pub fn install() -> Arc<Mutex<CancelState>> {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    let shared = Arc::clone(state());
    INSTALLED.get_or_init(|| {
        let handler_state = Arc::clone(&shared);
        let res = ctrlc::set_handler(move || {
            let st = handler_state.lock().unwrap();
            for &pid in &st.pids {
                // ESRCH (already gone) is fine.
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
            if let Some(ref dir) = st.workspace {
                let _ = std::fs::remove_dir_all(dir);
            }
            // 128 + SIGINT, the conventional interrupted-exit status.
            std::process::exit(130);
        });
        if let Err(e) = res {
            log::warn!("could not set Ctrl+C handler: {}", e);
        }
    });
    {
        let mut st = shared.lock().unwrap();
        st.pids.clear();
        st.workspace = None;
    }
    shared
}

/// Forget a finished run's pids and workspace. A signal arriving after the
/// run must not kill pids the kernel may already have recycled.
pub fn clear(state: &Arc<Mutex<CancelState>>) {
    let mut st = state.lock().unwrap();
    st.pids.clear();
    st.workspace = None;
}
