//! Orchestrator: owns the phase sequence and every piece of master-local
//! state (spec.md §4.14).
//!
//! Drives phases in order, routes `TASK:COMPLETE`/`TASK:FAILED` into the
//! active phase's hooks, and on a fatal error triggers cooperative
//! shutdown — grounded on the teacher's `cleanup::cleanup_browser_and_data`
//! two-phase graceful/forceful shutdown.

use std::collections::HashMap;

use crate::config::OrchestratorConfig;
use crate::orchestration::context::PageContext;
use crate::orchestration::conflict_resolver::LinkRewriteMap;
use crate::orchestration::discovery_queue::DiscoveryQueue;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::event_bus::{EventBus, OrchestratorEvent};
use crate::orchestration::execution_queue::ExecutionQueue;
use crate::orchestration::hidden_files::HiddenFileRegistry;
use crate::orchestration::ipc::CookieRecord;
use crate::orchestration::page_graph::PageGraph;
use crate::orchestration::title_registry::TitleRegistry;
use crate::orchestration::worker_pool::WorkerPool;

/// Stats rendered by the Complete phase (spec.md §4.13).
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub pages_discovered: usize,
    pub pages_downloaded: usize,
    pub pages_failed: usize,
    pub assets_downloaded: u64,
    pub aborted: bool,
}

/// Every piece of master-local state a phase may need. Passed by
/// `&mut` to each phase's `run`; no phase holds a reference across an
/// `.await` suspension point other than this one, preserving the
/// single-writer invariant of spec.md §5.
pub struct OrchestratorContext {
    pub config: OrchestratorConfig,
    pub bus: EventBus,
    pub pool: WorkerPool,
    pub discovery: DiscoveryQueue,
    pub execution: Option<ExecutionQueue>,
    pub titles: TitleRegistry,
    pub graph: PageGraph,
    pub hidden_files: HiddenFileRegistry,
    pub contexts: HashMap<crate::orchestration::context::PageId, PageContext>,
    pub cookies: Vec<CookieRecord>,
    pub rewrite_map: Option<LinkRewriteMap>,
    pub stats: RunStats,
    next_discovery_order: u64,
}

impl OrchestratorContext {
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            bus: EventBus::new(),
            pool: WorkerPool::new(),
            discovery: DiscoveryQueue::new(),
            execution: None,
            titles: TitleRegistry::new(),
            graph: PageGraph::new(),
            hidden_files: HiddenFileRegistry::new(),
            contexts: HashMap::new(),
            cookies: Vec::new(),
            rewrite_map: None,
            stats: RunStats::default(),
            next_discovery_order: 0,
        }
    }

    pub fn emit(&self, event: OrchestratorEvent) {
        self.bus.emit(&event);
    }

    /// Next monotonic discovery sequence number, used for deterministic
    /// conflict-resolution tie-breaking.
    pub fn next_discovery_order(&mut self) -> u64 {
        let order = self.next_discovery_order;
        self.next_discovery_order += 1;
        order
    }
}

/// What a phase hands back to the orchestrator's driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Continue,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Bootstrap,
    Discovery,
    Confirm,
    Conflict,
    Download,
    Complete,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Self::Bootstrap => "BOOTSTRAP",
            Self::Discovery => "DISCOVERY",
            Self::Confirm => "CONFIRM",
            Self::Conflict => "CONFLICT",
            Self::Download => "DOWNLOAD",
            Self::Complete => "COMPLETE",
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::Bootstrap => Some(Self::Discovery),
            Self::Discovery => Some(Self::Confirm),
            Self::Confirm => Some(Self::Conflict),
            Self::Conflict => Some(Self::Download),
            Self::Download => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

/// Top-level driver: owns the phase sequence. Fatal errors anywhere in
/// the pipeline propagate up through `?` and trigger `shutdown()`.
pub struct Orchestrator {
    ctx: OrchestratorContext,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { ctx: OrchestratorContext::new(config) }
    }

    pub async fn run(&mut self) -> Result<RunStats, OrchestratorError> {
        let mut phase = Phase::Bootstrap;
        loop {
            self.ctx.emit(OrchestratorEvent::PhaseChanged { phase: phase.name() });
            let outcome = self.run_phase(phase).await;
            match outcome {
                Ok(PhaseOutcome::Aborted) => {
                    self.ctx.stats.aborted = true;
                    if phase != Phase::Complete {
                        let _ = self.run_phase(Phase::Complete).await;
                    }
                    self.shutdown().await;
                    return Ok(self.ctx.stats.clone());
                }
                Ok(PhaseOutcome::Continue) => {}
                Err(err) => {
                    self.shutdown().await;
                    return Err(err);
                }
            }
            match phase.next() {
                Some(next) => phase = next,
                None => return Ok(self.ctx.stats.clone()),
            }
        }
    }

    async fn run_phase(&mut self, phase: Phase) -> Result<PhaseOutcome, OrchestratorError> {
        match phase {
            Phase::Bootstrap => crate::orchestration::phases::bootstrap::run(&mut self.ctx).await,
            Phase::Discovery => crate::orchestration::phases::discovery::run(&mut self.ctx).await,
            Phase::Confirm => crate::orchestration::phases::confirm::run(&mut self.ctx).await,
            Phase::Conflict => crate::orchestration::phases::conflict::run(&mut self.ctx).await,
            Phase::Download => crate::orchestration::phases::download::run(&mut self.ctx).await,
            Phase::Complete => crate::orchestration::phases::complete::run(&mut self.ctx).await,
        }
    }

    /// Cooperative SHUTDOWN broadcast, grace window, then force-kill.
    pub async fn shutdown(&mut self) {
        self.ctx.pool.shutdown_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_sequence_is_bootstrap_through_complete() {
        let mut phase = Phase::Bootstrap;
        let mut seen = vec![phase.name()];
        while let Some(next) = phase.next() {
            seen.push(next.name());
            phase = next;
        }
        assert_eq!(seen, vec!["BOOTSTRAP", "DISCOVERY", "CONFIRM", "CONFLICT", "DOWNLOAD", "COMPLETE"]);
    }
}
