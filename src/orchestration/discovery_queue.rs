//! BFS frontier with visited-set dedup and quiescence detection.
//!
//! The pending set is tracked by id, never by a counter — a negative count
//! is a fatal invariant violation the spec explicitly calls out (spec.md
//! §4.4), so there is no counter to go negative in the first place.

use std::collections::{HashSet, VecDeque};

use crate::orchestration::context::PageId;
use crate::orchestration::event_bus::{
    EventBus, OrchestratorEvent, DISCOVERY_ALL_IDLE, DISCOVERY_QUEUE_READY,
    DISCOVERY_TASK_COMPLETED,
};

#[derive(Debug, Clone)]
pub struct DiscoveryTask {
    pub id: PageId,
    pub url: String,
    pub parent_id: Option<PageId>,
    pub depth: u32,
    pub is_first_page: bool,
}

#[derive(Debug, Default)]
pub struct DiscoveryQueue {
    frontier: VecDeque<DiscoveryTask>,
    visited: HashSet<PageId>,
    pending: HashSet<PageId>,
    max_depth_seen: u32,
}

impl DiscoveryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_depth_seen(&self) -> u32 {
        self.max_depth_seen
    }

    /// Rejects re-enqueue of an already-visited id. Otherwise records the
    /// id, pushes the task, updates `max_depth_seen`, and emits
    /// `DISCOVERY:QUEUE_READY` on the empty→non-empty transition.
    pub fn enqueue(&mut self, task: DiscoveryTask, bus: &EventBus) -> bool {
        if self.visited.contains(&task.id) {
            return false;
        }
        let was_empty = self.frontier.is_empty() && self.pending.is_empty();
        self.visited.insert(task.id.clone());
        self.max_depth_seen = self.max_depth_seen.max(task.depth);
        self.frontier.push_back(task);
        if was_empty {
            bus.emit(&OrchestratorEvent::DiscoveryQueueReady);
        }
        true
    }

    /// Pops the next task and tags it pending.
    pub fn next(&mut self) -> Option<DiscoveryTask> {
        let task = self.frontier.pop_front()?;
        self.pending.insert(task.id.clone());
        Some(task)
    }

    fn settle(&mut self, id: &PageId, bus: &EventBus) {
        self.pending.remove(id);
        bus.emit(&OrchestratorEvent::DiscoveryTaskCompleted {
            pending_count: self.pending.len(),
            queue_length: self.frontier.len(),
        });
        if self.is_complete() {
            bus.emit(&OrchestratorEvent::DiscoveryAllIdle);
        }
    }

    /// Idempotent: settling an id not in `pending` is a no-op besides the
    /// event emission, matching spec.md §4.4.
    pub fn mark_complete(&mut self, id: &PageId, bus: &EventBus) {
        self.settle(id, bus);
    }

    pub fn mark_failed(&mut self, id: &PageId, bus: &EventBus) {
        self.settle(id, bus);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frontier.is_empty() && self.pending.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn queue_length(&self) -> usize {
        self.frontier.len()
    }

    #[must_use]
    pub fn is_visited(&self, id: &PageId) -> bool {
        self.visited.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, depth: u32) -> DiscoveryTask {
        DiscoveryTask {
            id: PageId::new(id),
            url: format!("https://example.com/{id}"),
            parent_id: None,
            depth,
            is_first_page: false,
        }
    }

    #[test]
    fn duplicate_enqueue_is_rejected_after_visit() {
        let bus = EventBus::new();
        let mut q = DiscoveryQueue::new();
        assert!(q.enqueue(task("a", 0), &bus));
        assert!(!q.enqueue(task("a", 0), &bus));
        assert_eq!(q.queue_length(), 1);
    }

    #[test]
    fn quiescence_after_single_task_drains() {
        let bus = EventBus::new();
        let mut q = DiscoveryQueue::new();
        q.enqueue(task("a", 0), &bus);
        let popped = q.next().expect("task present");
        assert_eq!(q.pending_count(), 1);
        q.mark_complete(&popped.id, &bus);
        assert!(q.is_complete());
    }

    #[test]
    fn settle_is_idempotent_for_unknown_id() {
        let bus = EventBus::new();
        let mut q = DiscoveryQueue::new();
        // Never enqueued — must not panic and must still report complete.
        q.mark_failed(&PageId::new("ghost"), &bus);
        assert!(q.is_complete());
    }

    #[test]
    fn max_depth_tracks_deepest_enqueued_task() {
        let bus = EventBus::new();
        let mut q = DiscoveryQueue::new();
        q.enqueue(task("a", 0), &bus);
        q.enqueue(task("b", 3), &bus);
        q.enqueue(task("c", 1), &bus);
        assert_eq!(q.max_depth_seen(), 3);
    }
}
