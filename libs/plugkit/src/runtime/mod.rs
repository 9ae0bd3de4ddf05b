pub mod host;
pub mod runner;
pub mod shutdown;

pub use host::{build_router, serve};
pub use runner::{run, run_with_registry, RunOptions, ShutdownOptions};
