//! Conflict Resolver: deduplicates pages sharing a canonical id and builds
//! the link-rewrite map (spec.md §4.7).
//!
//! Grounded on the teacher's `link_rewriter`/`link_index` URL→path mapping
//! idiom, generalized from "maintain one SQLite-backed path index" to a
//! pure, synchronous function over the full discovered context set.

use std::collections::HashMap;

use crate::orchestration::context::{PageContext, PageId};
use crate::orchestration::title_registry::TitleRegistry;

/// id -> canonical `target_file_path`, covering every id in every group
/// (canonical and duplicates alike).
pub type LinkRewriteMap = HashMap<PageId, String>;

#[derive(Debug)]
pub struct ConflictResolution {
    /// One canonical `PageContext` per id-group, each with `target_file_path` set.
    pub canonical: Vec<PageContext>,
    pub rewrite_map: LinkRewriteMap,
}

/// Picks the canonical context within an id-group using the first
/// applicable rule: depth==0 wins; else section/subsection metadata beats
/// none; else smaller depth wins; else first-discovered (by
/// `discovery_order`). Ties are otherwise deterministic.
fn pick_canonical(group: Vec<PageContext>) -> PageContext {
    let mut group = group;
    group.sort_by_key(|c| c.discovery_order);

    let mut best = group.remove(0);
    for candidate in group {
        let candidate_wins = if candidate.depth == 0 && best.depth != 0 {
            true
        } else if best.depth == 0 {
            false
        } else if candidate.has_section_metadata() && !best.has_section_metadata() {
            true
        } else if best.has_section_metadata() && !candidate.has_section_metadata() {
            false
        } else {
            candidate.depth < best.depth
        };
        if candidate_wins {
            best = candidate;
        }
    }
    best
}

/// Pure, idempotent (when re-applied to its own canonical output): groups
/// contexts by canonical id, resolves titles, picks one canonical context
/// per group, and emits the rewrite map.
#[must_use]
pub fn resolve(contexts: Vec<PageContext>, titles: &TitleRegistry) -> ConflictResolution {
    let mut groups: HashMap<PageId, Vec<PageContext>> = HashMap::new();
    for mut ctx in contexts {
        if let Some(title) = titles.get(&ctx.id) {
            ctx.resolved_title = Some(title.to_string());
            let sanitized = crate::orchestration::page_identity::sanitize(title);
            ctx.sanitized_title = Some(sanitized);
        }
        groups.entry(ctx.id.clone()).or_default().push(ctx);
    }

    let mut canonical = Vec::with_capacity(groups.len());
    let mut rewrite_map = LinkRewriteMap::new();

    for (id, group) in groups {
        let member_ids: Vec<PageId> = group.iter().map(|c| c.id.clone()).collect();
        let mut winner = pick_canonical(group);
        let path = crate::orchestration::fs_path_resolver::target_file_path(&winner)
            .to_string_lossy()
            .into_owned();
        winner.target_file_path = Some(path.clone());

        for member_id in member_ids {
            rewrite_map.insert(member_id, path.clone());
        }
        debug_assert_eq!(winner.id, id);
        canonical.push(winner);
    }

    ConflictResolution { canonical, rewrite_map }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str, depth: u32, order: u64, segments: &[&str]) -> PageContext {
        PageContext {
            id: PageId::new(id),
            url: format!("https://example.com/{id}"),
            depth,
            parent_id: if depth == 0 { None } else { Some(PageId::new("root")) },
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments: segments.iter().map(|s| s.to_string()).collect(),
            children: vec![],
            target_file_path: None,
            discovery_order: order,
            section: None,
            subsection: None,
        }
    }

    #[test]
    fn root_always_wins_over_depth() {
        let titles = TitleRegistry::new();
        let group = vec![ctx("x", 2, 1, &["a", "b"]), ctx("x", 0, 0, &[])];
        let resolution = resolve(group, &titles);
        assert_eq!(resolution.canonical.len(), 1);
        assert_eq!(resolution.canonical[0].depth, 0);
        assert_eq!(resolution.rewrite_map[&PageId::new("x")], "index.html");
    }

    #[test]
    fn diamond_shallower_duplicate_wins_and_all_ids_map_to_same_path() {
        let titles = TitleRegistry::new();
        let group = vec![
            ctx("c", 2, 2, &["a", "c"]),
            ctx("c", 2, 3, &["b", "c"]),
        ];
        let resolution = resolve(group, &titles);
        assert_eq!(resolution.canonical.len(), 1);
        // Ties at equal depth fall through to first-discovered.
        assert_eq!(resolution.canonical[0].path_segments, vec!["a", "c"]);
        assert_eq!(resolution.rewrite_map.len(), 1);
    }

    #[test]
    fn section_metadata_beats_none_at_equal_depth() {
        let titles = TitleRegistry::new();
        let mut with_section = ctx("x", 1, 0, &["a"]);
        with_section.section = Some("intro".into());
        let without_section = ctx("x", 1, 1, &["a"]);
        let resolution = resolve(vec![without_section, with_section], &titles);
        assert!(resolution.canonical[0].has_section_metadata());
    }

    #[test]
    fn resolve_is_idempotent_on_its_own_canonical_output() {
        let titles = TitleRegistry::new();
        let group = vec![ctx("x", 1, 0, &["a"])];
        let first = resolve(group, &titles);
        let second = resolve(first.canonical, &titles);
        assert_eq!(second.canonical.len(), 1);
        assert_eq!(second.canonical[0].target_file_path, Some("a/index.html".into()));
    }
}
