//! Core configuration type for the orchestration kernel.
//!
//! This module contains the `OrchestratorConfig` struct: the effective knobs
//! an orchestrator run is parameterized by (root URL, output directory,
//! depth/timeout/capacity settings).

use std::path::PathBuf;

/// Effective configuration for one orchestrator run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Root URL to start discovery from.
    pub(crate) root_url: String,

    /// Output directory the mirror is written under.
    ///
    /// **Invariant:** always an absolute path (normalized in the builder).
    pub(crate) output_dir: PathBuf,

    /// Maximum recursion depth; discovery tasks at or past this depth are
    /// absorbed as `DEPTH_LIMIT` rather than dispatched.
    pub(crate) max_depth: u32,

    /// Per-page navigation/load timeout, forwarded to workers in `INIT`.
    pub(crate) page_load_timeout_secs: u64,

    /// Per-navigation timeout, forwarded to workers.
    pub(crate) navigation_timeout_secs: u64,

    /// How long Bootstrap waits after the first page loads before treating
    /// whatever cookies were captured as final.
    pub(crate) cookie_wait_secs: u64,

    /// Hard cap on concurrent worker processes. `None` triggers the capacity
    /// planning formula at startup (`clamp(min, max, min(cpus-1, 0.7*freeMemMB/1024))`).
    pub(crate) max_workers: Option<u32>,

    /// Timeout waiting for a freshly-spawned worker's `READY` envelope.
    pub(crate) worker_spawn_timeout_secs: u64,

    /// Timeout waiting for an idle worker to become available (§4.11 fatal path).
    pub(crate) worker_allocation_timeout_secs: u64,

    /// Discovery phase quiescence timeout (§4.4 fatal path).
    pub(crate) discovery_timeout_secs: u64,

    /// Conservative free-memory estimate in MB used by the capacity formula
    /// when the host's real free memory cannot be sampled (or is overridden).
    ///
    /// The teacher's pack carries no free-memory reader; this is config input
    /// rather than a fabricated dependency, see DESIGN.md.
    pub(crate) free_mem_mb_override: Option<u64>,

    /// Skip the User Confirmation phase and phases 4-6 entirely; only
    /// discovery runs and Complete reports discovery-only stats.
    pub(crate) dry_run: bool,
}

impl OrchestratorConfig {
    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn cookie_wait_secs(&self) -> u64 {
        self.cookie_wait_secs
    }

    #[must_use]
    pub fn max_workers(&self) -> Option<u32> {
        self.max_workers
    }

    #[must_use]
    pub fn worker_spawn_timeout_secs(&self) -> u64 {
        self.worker_spawn_timeout_secs
    }

    #[must_use]
    pub fn worker_allocation_timeout_secs(&self) -> u64 {
        self.worker_allocation_timeout_secs
    }

    #[must_use]
    pub fn discovery_timeout_secs(&self) -> u64 {
        self.discovery_timeout_secs
    }

    #[must_use]
    pub fn free_mem_mb_override(&self) -> Option<u64> {
        self.free_mem_mb_override
    }

    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}
