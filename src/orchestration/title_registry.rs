//! ID→title map, populated lazily as workers resolve pages.
//!
//! First-writer-wins by design: later resolutions for the same id are
//! ignored (spec.md §4.5). A plain `HashMap` suffices — the master is
//! single-threaded, so `DashMap` is reserved for genuinely concurrent,
//! OS-process-facing structures like the Hidden File Registry.

use std::collections::HashMap;

use crate::orchestration::context::PageId;

#[derive(Debug, Default)]
pub struct TitleRegistry {
    titles: HashMap<PageId, String>,
}

impl TitleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `title` for `id` if and only if no title is already present.
    /// Returns whether this call was the one that won.
    pub fn register(&mut self, id: PageId, title: String) -> bool {
        if self.titles.contains_key(&id) {
            false
        } else {
            self.titles.insert(id, title);
            true
        }
    }

    #[must_use]
    pub fn get(&self, id: &PageId) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    /// Flat snapshot used to ship the whole registry to a worker at init or
    /// at phase boundaries.
    #[must_use]
    pub fn serialize(&self) -> HashMap<PageId, String> {
        self.titles.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let mut reg = TitleRegistry::new();
        assert!(reg.register(PageId::new("a"), "First".into()));
        assert!(!reg.register(PageId::new("a"), "Second".into()));
        assert_eq!(reg.get(&PageId::new("a")), Some("First"));
    }

    #[test]
    fn serialize_produces_flat_snapshot() {
        let mut reg = TitleRegistry::new();
        reg.register(PageId::new("a"), "A".into());
        reg.register(PageId::new("b"), "B".into());
        let snap = reg.serialize();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.get(&PageId::new("b")).map(String::as_str), Some("B"));
    }
}
