//! Engine module: CLI surface, process topology, and supervision.

pub mod arg_parser;
pub mod cli;
pub mod core;
pub mod fan;
pub mod pool;
pub mod supervisor;

// Re-export commonly used items
pub use arg_parser::{Cli, Helper};
pub use cli::{handle_run, setup_opts};
pub use core::run_parallel;
pub use pool::{sh_quote, worker_script};
pub use supervisor::{Supervised, Supervisor};
