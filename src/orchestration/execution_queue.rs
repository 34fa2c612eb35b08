//! Download scheduling queue: seeded leaf-first after conflict resolution
//! (spec.md §4.8).
//!
//! Mirrors the Discovery Queue's operation shape but is seeded once, in
//! descending-depth order, rather than growing as pages are discovered.
//! Depth-first-from-the-leaves downloading lets the Hidden File Registry
//! populate before a shallower page references the same asset.

use std::path::{Path, PathBuf};

use crate::orchestration::context::PageContext;
use crate::orchestration::error::ErrorKind;

#[derive(Debug, Clone)]
pub struct ExecutionTask {
    pub context: PageContext,
    pub absolute_save_path: PathBuf,
}

/// Dependency counters kept for observability only; never a scheduling
/// gate, per spec.md §4.8 — the leaf-first seed order already dominates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyCounters {
    pub children_count: u32,
    pub completed_children: u32,
}

#[derive(Debug)]
pub struct ExecutionQueue {
    queue: Vec<ExecutionTask>,
    pending: std::collections::HashSet<crate::orchestration::context::PageId>,
    counters: std::collections::HashMap<crate::orchestration::context::PageId, DependencyCounters>,
    parent_of: std::collections::HashMap<crate::orchestration::context::PageId, crate::orchestration::context::PageId>,
    output_dir: PathBuf,
}

impl ExecutionQueue {
    /// Seeds the queue in ascending depth order, ties broken so the
    /// earlier-discovered context sorts last — `next()` pops off the back,
    /// so the vector's back-to-front order is deepest-first, and within a
    /// depth tier the earliest-discovered context pops first.
    /// `output_dir` must already be absolute — callers pass
    /// `OrchestratorConfig::output_dir()`.
    #[must_use]
    pub fn build(contexts: Vec<PageContext>, output_dir: &Path) -> Self {
        let mut contexts = contexts;
        contexts.sort_by(|a, b| {
            a.depth
                .cmp(&b.depth)
                .then_with(|| b.discovery_order.cmp(&a.discovery_order))
        });

        let mut counters = std::collections::HashMap::new();
        let mut parent_of = std::collections::HashMap::new();
        for ctx in &contexts {
            if let Some(parent) = &ctx.parent_id {
                counters
                    .entry(parent.clone())
                    .or_insert_with(DependencyCounters::default)
                    .children_count += 1;
                parent_of.insert(ctx.id.clone(), parent.clone());
            }
        }

        let queue = contexts
            .into_iter()
            .map(|context| {
                let target = context
                    .target_file_path
                    .clone()
                    .unwrap_or_else(|| "index.html".to_string());
                let absolute_save_path = output_dir.join(target);
                ExecutionTask { context, absolute_save_path }
            })
            .collect();

        Self {
            queue,
            pending: std::collections::HashSet::new(),
            counters,
            parent_of,
            output_dir: output_dir.to_path_buf(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Pops the next task. The returned `absolute_save_path` is always
    /// absolute — a relative path here is a fatal programmer error upstream.
    pub fn next(&mut self) -> Option<ExecutionTask> {
        let task = self.queue.pop()?;
        debug_assert!(
            task.absolute_save_path.is_absolute(),
            "execution queue must never emit a relative save path"
        );
        self.pending.insert(task.context.id.clone());
        Some(task)
    }

    pub fn mark_complete(&mut self, id: &crate::orchestration::context::PageId) {
        self.settle(id);
    }

    pub fn mark_failed(&mut self, id: &crate::orchestration::context::PageId, _kind: ErrorKind) {
        self.settle(id);
    }

    fn settle(&mut self, id: &crate::orchestration::context::PageId) {
        self.pending.remove(id);
        if let Some(parent) = self.parent_of.get(id).cloned() {
            if let Some(parent_counters) = self.counters.get_mut(&parent) {
                parent_counters.completed_children += 1;
            }
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.queue.is_empty() && self.pending.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn counters(&self, id: &crate::orchestration::context::PageId) -> DependencyCounters {
        self.counters.get(id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::context::PageId;

    fn ctx(id: &str, depth: u32, order: u64, parent: Option<&str>) -> PageContext {
        PageContext {
            id: PageId::new(id),
            url: format!("https://example.com/{id}"),
            depth,
            parent_id: parent.map(PageId::new),
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments: vec![],
            children: vec![],
            target_file_path: Some(format!("{id}/index.html")),
            discovery_order: order,
            section: None,
            subsection: None,
        }
    }

    #[test]
    fn seeds_in_descending_depth_order() {
        let out = PathBuf::from("/tmp/out");
        let mut q = ExecutionQueue::build(
            vec![ctx("root", 0, 0, None), ctx("leaf", 2, 2, None), ctx("mid", 1, 1, None)],
            &out,
        );
        assert_eq!(q.next().unwrap().context.id, PageId::new("leaf"));
        assert_eq!(q.next().unwrap().context.id, PageId::new("mid"));
        assert_eq!(q.next().unwrap().context.id, PageId::new("root"));
    }

    #[test]
    fn save_path_is_always_absolute() {
        let out = PathBuf::from("/tmp/out");
        let mut q = ExecutionQueue::build(vec![ctx("a", 1, 0, None)], &out);
        let task = q.next().expect("task present");
        assert!(task.absolute_save_path.is_absolute());
        assert_eq!(task.absolute_save_path, PathBuf::from("/tmp/out/a/index.html"));
    }

    #[test]
    fn completion_tracks_queue_and_pending() {
        let out = PathBuf::from("/tmp/out");
        let mut q = ExecutionQueue::build(vec![ctx("a", 0, 0, None)], &out);
        assert!(!q.is_complete());
        let task = q.next().unwrap();
        assert!(!q.is_complete());
        q.mark_complete(&task.context.id);
        assert!(q.is_complete());
    }
}
