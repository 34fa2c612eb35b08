//! Bootstrap phase (spec.md §4.13): capacity plan, spawn the first worker,
//! dispatch the root DISCOVER, capture cookies, then spawn the rest.

use std::time::Duration;

use crate::orchestration::context::PageId;
use crate::orchestration::discovery_queue::DiscoveryTask;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::event_bus::OrchestratorEvent;
use crate::orchestration::ipc::{InitSnapshot, MasterCommand, ResultData, TaskType};
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};
use crate::orchestration::page_identity::extract_canonical_id;
use crate::orchestration::worker_pool::plan_capacity;
use crate::orchestration::worker_proxy::WorkerOutcome;

fn worker_binary_path() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap_or_else(|_| "worker".into());
    path.pop();
    path.push(if cfg!(windows) { "worker.exe" } else { "worker" });
    path
}

fn free_mem_mb(config: &crate::config::OrchestratorConfig) -> u64 {
    if let Some(mb) = config.free_mem_mb_override() {
        return mb;
    }
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    system.available_memory() / (1024 * 1024)
}

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    let worker_count = ctx.config.max_workers().unwrap_or_else(|| {
        plan_capacity(num_cpus::get() as u32, free_mem_mb(&ctx.config))
    });
    let spawn_timeout = Duration::from_secs(ctx.config.worker_spawn_timeout_secs());
    let binary = worker_binary_path();

    let first_worker = ctx.pool.spawn_worker(&binary, spawn_timeout, &ctx.bus).await?;

    let snapshot = InitSnapshot {
        root_url: ctx.config.root_url().to_string(),
        max_depth: ctx.config.max_depth(),
        page_load_timeout_secs: ctx.config.page_load_timeout_secs(),
        navigation_timeout_secs: ctx.config.navigation_timeout_secs(),
        cookie_wait_secs: ctx.config.cookie_wait_secs(),
    };
    let init = MasterCommand::Init { config: snapshot, titles: ctx.titles.serialize() };
    let root_id = PageId::new(extract_canonical_id(ctx.config.root_url()));

    {
        let proxy = ctx
            .pool
            .workers_mut()
            .get_mut(&first_worker)
            .ok_or_else(|| OrchestratorError::InvariantViolation("first worker missing after spawn".into()))?;
        proxy
            .send_control(&init)
            .await
            .map_err(|e| OrchestratorError::InvariantViolation(e.to_string()))?;
    }

    ctx.discovery.enqueue(
        DiscoveryTask {
            id: root_id.clone(),
            url: ctx.config.root_url().to_string(),
            parent_id: None,
            depth: 0,
            is_first_page: true,
        },
        &ctx.bus,
    );
    ctx.discovery.next();

    let discover = MasterCommand::Discover {
        url: ctx.config.root_url().to_string(),
        page_id: root_id.clone(),
        parent_id: None,
        depth: 0,
        is_first_page: true,
        cookies: None,
    };

    let proxy = ctx
        .pool
        .workers_mut()
        .get_mut(&first_worker)
        .ok_or_else(|| OrchestratorError::InvariantViolation("first worker missing".into()))?;
    proxy
        .send_command("bootstrap-root".into(), TaskType::Discover, &discover)
        .await
        .map_err(|e| OrchestratorError::InvariantViolation(e.to_string()))?;

    let outcome = loop {
        if let Some(outcome) = proxy.poll(&ctx.bus).await {
            break outcome;
        }
    };

    let mut captured_cookies = Vec::new();
    match outcome {
        WorkerOutcome::Completed { data: Some(ResultData::Discovery(result)), .. } => {
            if let Some(cookies) = result.cookies.clone() {
                captured_cookies = cookies;
            } else {
                tracing::info!("no cookies captured on first page; treating as no-auth site");
            }
            ctx.discovery.mark_complete(&root_id, &ctx.bus);
            crate::orchestration::phases::discovery::seed_root_context(ctx, &root_id);
            ctx.bus.emit(&OrchestratorEvent::LinksDiscovered { source: root_id.clone(), links: result.links.clone() });
            crate::orchestration::phases::discovery::apply_discovery_result(
                ctx,
                &root_id,
                0,
                result.resolved_title.clone(),
                &result.links,
            );
        }
        WorkerOutcome::Failed { error, .. } => {
            ctx.discovery.mark_failed(&root_id, &ctx.bus);
            return Err(OrchestratorError::InvariantViolation(format!(
                "root page discovery failed: {}",
                error.message
            )));
        }
        _ => {}
    }

    ctx.cookies = captured_cookies.clone();
    if !ctx.cookies.is_empty() {
        let proxy = ctx.pool.workers_mut().get_mut(&first_worker);
        if let Some(proxy) = proxy {
            let _ = proxy.send_control(&MasterCommand::SetCookies { cookies: ctx.cookies.clone() }).await;
        }
    }

    for _ in 1..worker_count {
        match ctx.pool.spawn_worker(&binary, spawn_timeout, &ctx.bus).await {
            Ok(worker_id) => {
                if let Some(proxy) = ctx.pool.workers_mut().get_mut(&worker_id) {
                    let _ = proxy.send_control(&init).await;
                    if !ctx.cookies.is_empty() {
                        let _ = proxy.send_control(&MasterCommand::SetCookies { cookies: ctx.cookies.clone() }).await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to spawn additional worker during bootstrap");
            }
        }
    }

    ctx.bus.emit(&OrchestratorEvent::BootstrapComplete { worker_count: ctx.pool.len() as u32 });
    Ok(PhaseOutcome::Continue)
}
