//! Discovery phase (spec.md §4.13): pumps the frontier into the worker
//! pool, updates the Title Registry and Page Graph on every RESULT, and
//! terminates on `DISCOVERY:ALL_IDLE` or a 30-minute no-progress timeout.

use std::time::Duration;

use crate::orchestration::context::{Link, PageContext, PageId};
use crate::orchestration::discovery_queue::DiscoveryTask;
use crate::orchestration::error::{ErrorKind, OrchestratorError};
use crate::orchestration::event_bus::OrchestratorEvent;
use crate::orchestration::ipc::{MasterCommand, ResultData, TaskType};
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};
use crate::orchestration::page_identity::{extract_canonical_id, sanitize};
use crate::orchestration::worker_proxy::WorkerOutcome;

pub(crate) fn seed_root_context(ctx: &mut OrchestratorContext, root_id: &PageId) {
    if ctx.contexts.contains_key(root_id) {
        return;
    }
    let order = ctx.next_discovery_order();
    ctx.contexts.insert(
        root_id.clone(),
        PageContext {
            id: root_id.clone(),
            url: ctx.config.root_url().to_string(),
            depth: 0,
            parent_id: None,
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments: vec![],
            children: vec![],
            target_file_path: None,
            discovery_order: order,
            section: None,
            subsection: None,
        },
    );
}

fn seed_child_context(ctx: &mut OrchestratorContext, id: &PageId, url: &str, parent_id: &PageId, depth: u32) {
    if ctx.contexts.contains_key(id) {
        return;
    }
    let parent_segments = ctx.contexts.get(parent_id).map(|p| p.path_segments.clone()).unwrap_or_default();
    let order = ctx.next_discovery_order();
    let mut path_segments = parent_segments;
    // Placeholder occupying this page's own trailing segment, so
    // `depth == path_segments.len()` holds immediately; replaced with the
    // sanitized title once this page's own RESULT resolves it.
    path_segments.push(id.as_str().to_string());

    ctx.contexts.insert(
        id.clone(),
        PageContext {
            id: id.clone(),
            url: url.to_string(),
            depth,
            parent_id: Some(parent_id.clone()),
            raw_title: None,
            resolved_title: None,
            sanitized_title: None,
            path_segments,
            children: vec![],
            target_file_path: None,
            discovery_order: order,
            section: None,
            subsection: None,
        },
    );
}

/// Applies one DISCOVER RESULT to master state: title/path-segment
/// resolution, Page Graph edge classification, child-context seeding, and
/// frontier enqueue of newly-discovered links. Shared between Bootstrap's
/// synchronous root dispatch and the Discovery phase's main pump loop so
/// both apply identical edge-classification and dedup rules.
pub(crate) fn apply_discovery_result(
    ctx: &mut OrchestratorContext,
    page_id: &PageId,
    depth: u32,
    resolved_title: Option<String>,
    links: &[Link],
) {
    if let Some(title) = resolved_title {
        ctx.titles.register(page_id.clone(), title.clone());
        if let Some(entry) = ctx.contexts.get_mut(page_id) {
            let sanitized = sanitize(&title);
            if let Some(last) = entry.path_segments.last_mut() {
                *last = sanitized.clone();
            }
            entry.resolved_title = Some(title);
            entry.sanitized_title = Some(sanitized);
        }
    }
    if !ctx.graph.contains(page_id) {
        let parent = ctx.contexts.get(page_id).and_then(|c| c.parent_id.clone());
        ctx.graph.insert_node(page_id.clone(), parent, depth);
    }

    for link in links {
        let link_id = PageId::new(extract_canonical_id(&link.url));
        let target_is_new = !ctx.discovery.is_visited(&link_id);
        let kind = ctx.graph.classify_edge(page_id, &link_id, target_is_new);
        ctx.bus.emit(&OrchestratorEvent::EdgeClassified {
            source: page_id.clone(),
            target: link_id.clone(),
            kind,
        });

        if target_is_new {
            seed_child_context(ctx, &link_id, &link.url, page_id, depth + 1);
            ctx.graph.insert_node(link_id.clone(), Some(page_id.clone()), depth + 1);
            if let Some(parent) = ctx.contexts.get_mut(page_id) {
                parent.children.push(link_id.clone());
            }
            ctx.discovery.enqueue(
                DiscoveryTask {
                    id: link_id,
                    url: link.url.clone(),
                    parent_id: Some(page_id.clone()),
                    depth: depth + 1,
                    is_first_page: false,
                },
                &ctx.bus,
            );
        }
    }
}

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    let phase_timeout = Duration::from_secs(ctx.config.discovery_timeout_secs());
    let mut last_progress = tokio::time::Instant::now();

    loop {
        if ctx.discovery.is_complete() {
            break;
        }
        if last_progress.elapsed() > phase_timeout {
            return Err(OrchestratorError::PhaseTimeout { phase: "DISCOVERY", secs: phase_timeout.as_secs() });
        }

        while let Some(task) = ctx.discovery.next() {
            if task.depth > ctx.config.max_depth() {
                ctx.discovery.mark_failed(&task.id, &ctx.bus);
                ctx.bus.emit(&OrchestratorEvent::TaskFailed {
                    task_id: task.id.to_string(),
                    page_id: Some(task.id.clone()),
                    kind: ErrorKind::DepthLimit,
                    message: "max depth reached".to_string(),
                });
                continue;
            }
            let command = MasterCommand::Discover {
                url: task.url.clone(),
                page_id: task.id.clone(),
                parent_id: task.parent_id.clone(),
                depth: task.depth,
                is_first_page: false,
                cookies: if ctx.cookies.is_empty() { None } else { Some(ctx.cookies.clone()) },
            };
            ctx.pool
                .execute(task.id.to_string(), TaskType::Discover, &command, &ctx.bus)
                .await?;
        }

        let outcomes = ctx.pool.poll_all(&ctx.bus).await;
        if outcomes.is_empty() {
            tokio::time::sleep(Duration::from_millis(25)).await;
            continue;
        }
        last_progress = tokio::time::Instant::now();

        for outcome in outcomes {
            match outcome {
                WorkerOutcome::Completed { data: Some(ResultData::Discovery(result)), .. } => {
                    let page_id = result.page_id.clone();
                    let depth = ctx.contexts.get(&page_id).map(|c| c.depth).unwrap_or(0);
                    ctx.discovery.mark_complete(&page_id, &ctx.bus);
                    apply_discovery_result(ctx, &page_id, depth, result.resolved_title, &result.links);
                    ctx.bus.emit(&OrchestratorEvent::DiscoveryProgress {
                        discovered: ctx.contexts.len(),
                        resolved: ctx.titles.serialize().len(),
                    });
                }
                WorkerOutcome::Completed { .. } => {}
                WorkerOutcome::Failed { task_id, error } => {
                    ctx.stats.pages_failed += 1;
                    let page_id = PageId::new(task_id);
                    ctx.discovery.mark_failed(&page_id, &ctx.bus);
                    tracing::warn!(page = %page_id, kind = %error.kind, "discovery task failed");
                }
            }
        }
    }

    ctx.stats.pages_discovered = ctx.contexts.len();
    Ok(PhaseOutcome::Continue)
}
