pub mod browser_setup;
pub mod config;
pub mod orchestration;
pub mod runtime;
pub mod utils;

pub use browser_setup::{
    apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser,
};
pub use config::OrchestratorConfig;
pub use orchestration::{ErrorKind, Orchestrator, OrchestratorError, RunStats};
