//! Shared data model: page identity, the page context, and the edge kinds
//! recorded by the page graph.
//!
//! `PageContext` lives master-side only and carries `children`; the wire
//! form workers actually receive (`WirePageContext`) omits it entirely, so
//! no pointer graph ever has to survive IPC — only `parent_id` plus the
//! pre-computed `path_segments`.

use serde::{Deserialize, Serialize};

/// Canonical 32-hex page identifier extracted from a URL's path, or (worker
/// side, for consistency) the raw URL itself when no hex run is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub String);

impl PageId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One entity per discovered URL.
///
/// Invariants (spec.md §3):
/// (i) `id` is stable and unique per canonical page.
/// (ii) `depth == path_segments.len()` except at the root.
/// (iii) `parent_id.is_none() <=> depth == 0`.
/// (iv) `path_segments` survives serialization exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub id: PageId,
    pub url: String,
    pub depth: u32,
    pub parent_id: Option<PageId>,
    pub raw_title: Option<String>,
    pub resolved_title: Option<String>,
    pub sanitized_title: Option<String>,
    pub path_segments: Vec<String>,
    /// Master-side only: IDs of pages this context was the first discoverer
    /// of. Never sent over the wire.
    pub children: Vec<PageId>,
    /// Relative on-disk path assigned by the Conflict Resolver.
    pub target_file_path: Option<String>,
    /// Discovery sequence number, used for deterministic tie-breaking.
    pub discovery_order: u64,
    /// Section/subsection hint carried from the link that discovered this
    /// page, used by the Conflict Resolver's tie-break rule.
    pub section: Option<String>,
    pub subsection: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    #[must_use]
    pub fn has_section_metadata(&self) -> bool {
        self.section.is_some() || self.subsection.is_some()
    }

    /// Build the serialized form sent to workers: strips `children`.
    #[must_use]
    pub fn to_wire(&self) -> WirePageContext {
        WirePageContext {
            id: self.id.clone(),
            url: self.url.clone(),
            depth: self.depth,
            parent_id: self.parent_id.clone(),
            raw_title: self.raw_title.clone(),
            resolved_title: self.resolved_title.clone(),
            sanitized_title: self.sanitized_title.clone(),
            path_segments: self.path_segments.clone(),
            target_file_path: self.target_file_path.clone(),
        }
    }
}

/// Wire-form of `PageContext`: no `children`, no discovery bookkeeping.
/// This is the only form that ever crosses the master/worker IPC boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePageContext {
    pub id: PageId,
    pub url: String,
    pub depth: u32,
    pub parent_id: Option<PageId>,
    pub raw_title: Option<String>,
    pub resolved_title: Option<String>,
    pub sanitized_title: Option<String>,
    pub path_segments: Vec<String>,
    pub target_file_path: Option<String>,
}

/// Discovery result item: one outbound link found on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub link_text: String,
    pub section: Option<String>,
    pub subsection: Option<String>,
}

/// Classification of an edge discovered between two pages, adapted to a
/// dynamically-discovered web (spec.md §4.6). Purely structural — does not
/// mutate the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// First discovery of the target; assigns `target.parent_id`.
    Tree,
    /// `target.depth > source.depth` and target is a tree-descendant of source.
    Forward,
    /// `target` is a tree-ancestor of `source`, or `target == source`.
    Back { is_self_loop: bool },
    /// Neither ancestor nor descendant along the tree.
    Cross,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_id_round_trips_through_json() {
        let id = PageId::new("abc123");
        let json = serde_json::to_string(&id).expect("serialize");
        let back: PageId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }

    #[test]
    fn to_wire_drops_children_and_discovery_order() {
        let ctx = PageContext {
            id: PageId::new("root"),
            url: "https://example.com".into(),
            depth: 0,
            parent_id: None,
            raw_title: None,
            resolved_title: Some("Home".into()),
            sanitized_title: Some("Home".into()),
            path_segments: vec![],
            children: vec![PageId::new("child-1")],
            target_file_path: Some("index.html".into()),
            discovery_order: 0,
            section: None,
            subsection: None,
        };

        let wire = ctx.to_wire();
        let json = serde_json::to_value(&wire).expect("serialize");
        assert!(json.get("children").is_none());
        assert_eq!(json["id"], "root");
    }

    #[test]
    fn root_has_no_parent_and_zero_depth() {
        let ctx = PageContext {
            id: PageId::new("root"),
            url: "https://example.com".into(),
            depth: 0,
            parent_id: None,
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments: vec![],
            children: vec![],
            target_file_path: None,
            discovery_order: 0,
            section: None,
            subsection: None,
        };
        assert!(ctx.is_root());
        assert_eq!(ctx.depth as usize, ctx.path_segments.len());
    }
}
