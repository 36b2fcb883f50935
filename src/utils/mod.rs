pub mod cancel;
pub mod config;
pub mod logger;

pub use cancel::{CancelState, install};
pub use config::*;
pub use logger::setup_logging;
