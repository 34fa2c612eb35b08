//! Process-local, synchronous publish/subscribe event bus.
//!
//! Grounded on the teacher's `crawl_events::bus::CrawlEventBus`, but
//! de-broadcast-ified per spec.md §9's design note ("avoid giving the bus
//! queueing semantics"): this is a `HashMap<topic, Vec<handler>>` rather than
//! a `tokio::sync::broadcast` channel. The master runs as a single-threaded
//! cooperative loop (spec.md §5), so no lock is needed — `emit` iterates
//! registered handlers synchronously and returns once all of them have run.

use std::collections::HashMap;

use crate::orchestration::context::{EdgeKind, Link, PageId};
use crate::orchestration::error::ErrorKind;

pub const PHASE_CHANGED: &str = "PHASE:CHANGED";
pub const BOOTSTRAP_COMPLETE: &str = "BOOTSTRAP:COMPLETE";
pub const DISCOVERY_QUEUE_READY: &str = "DISCOVERY:QUEUE_READY";
pub const DISCOVERY_TASK_COMPLETED: &str = "DISCOVERY:TASK_COMPLETED";
pub const DISCOVERY_PROGRESS: &str = "DISCOVERY:PROGRESS";
pub const DISCOVERY_ALL_IDLE: &str = "DISCOVERY:ALL_IDLE";
pub const EXECUTION_PROGRESS: &str = "EXECUTION:PROGRESS";
pub const WORKER_READY: &str = "WORKER:READY";
pub const WORKER_BUSY: &str = "WORKER:BUSY";
pub const WORKER_IDLE: &str = "WORKER:IDLE";
pub const WORKER_CRASHED: &str = "WORKER:CRASHED";
pub const TASK_STARTED: &str = "TASK:STARTED";
pub const TASK_COMPLETE: &str = "TASK:COMPLETE";
pub const TASK_FAILED: &str = "TASK:FAILED";

/// Payload carried by an emitted event. One variant per topic that needs
/// structured data; dashboards match on `topic()`.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    PhaseChanged { phase: &'static str },
    BootstrapComplete { worker_count: u32 },
    DiscoveryQueueReady,
    DiscoveryTaskCompleted { pending_count: usize, queue_length: usize },
    DiscoveryProgress { discovered: usize, resolved: usize },
    DiscoveryAllIdle,
    ExecutionProgress { completed: usize, total: usize },
    WorkerReady { worker_id: u32, pid: u32 },
    WorkerBusy { worker_id: u32 },
    WorkerIdle { worker_id: u32 },
    WorkerCrashed { worker_id: u32 },
    TaskStarted { worker_id: u32, task_id: String },
    TaskComplete { task_id: String, page_id: PageId },
    TaskFailed { task_id: String, page_id: Option<PageId>, kind: ErrorKind, message: String },
    EdgeClassified { source: PageId, target: PageId, kind: EdgeKind },
    LinksDiscovered { source: PageId, links: Vec<Link> },
}

impl OrchestratorEvent {
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => PHASE_CHANGED,
            Self::BootstrapComplete { .. } => BOOTSTRAP_COMPLETE,
            Self::DiscoveryQueueReady => DISCOVERY_QUEUE_READY,
            Self::DiscoveryTaskCompleted { .. } => DISCOVERY_TASK_COMPLETED,
            Self::DiscoveryProgress { .. } => DISCOVERY_PROGRESS,
            Self::DiscoveryAllIdle => DISCOVERY_ALL_IDLE,
            Self::ExecutionProgress { .. } => EXECUTION_PROGRESS,
            Self::WorkerReady { .. } => WORKER_READY,
            Self::WorkerBusy { .. } => WORKER_BUSY,
            Self::WorkerIdle { .. } => WORKER_IDLE,
            Self::WorkerCrashed { .. } => WORKER_CRASHED,
            Self::TaskStarted { .. } => TASK_STARTED,
            Self::TaskComplete { .. } => TASK_COMPLETE,
            Self::TaskFailed { .. } => TASK_FAILED,
            // Graph events ride the discovery-progress topic; dashboards that
            // care about edges subscribe there and match further.
            Self::EdgeClassified { .. } | Self::LinksDiscovered { .. } => DISCOVERY_PROGRESS,
        }
    }
}

type Handler = Box<dyn Fn(&OrchestratorEvent)>;

/// Single-process synchronous pub/sub bus. No back-pressure, no persistence —
/// a control-plane primitive, not a queue (spec.md §4.2).
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<&'static str, Vec<Handler>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic`. Unknown topics are simply never emitted.
    pub fn subscribe(&mut self, topic: &'static str, handler: Handler) {
        self.handlers.entry(topic).or_default().push(handler);
    }

    /// Dispatch `event` synchronously to every handler registered on its topic.
    pub fn emit(&self, event: &OrchestratorEvent) {
        if let Some(handlers) = self.handlers.get(event.topic()) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_dispatches_only_to_matching_topic() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = seen.clone();
        bus.subscribe(
            DISCOVERY_ALL_IDLE,
            Box::new(move |_event| seen_clone.borrow_mut().push("all_idle")),
        );
        let seen_clone = seen.clone();
        bus.subscribe(
            WORKER_READY,
            Box::new(move |_event| seen_clone.borrow_mut().push("worker_ready")),
        );

        bus.emit(&OrchestratorEvent::DiscoveryAllIdle);

        assert_eq!(*seen.borrow(), vec!["all_idle"]);
    }

    #[test]
    fn unknown_topic_receives_nothing() {
        let bus = EventBus::new();
        // No subscribers at all; emit must not panic.
        bus.emit(&OrchestratorEvent::WorkerReady { worker_id: 1, pid: 42 });
    }
}
