//! Download phase (spec.md §4.13): builds the Execution Queue from the
//! canonical context set, pumps it into the worker pool, and ends when
//! `ExecutionQueue::is_complete()`.

use std::time::Duration;

use crate::orchestration::error::OrchestratorError;
use crate::orchestration::event_bus::OrchestratorEvent;
use crate::orchestration::execution_queue::ExecutionQueue;
use crate::orchestration::ipc::{MasterCommand, ResultData, TaskType};
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};
use crate::orchestration::worker_proxy::WorkerOutcome;

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    let rewrite_map = ctx.rewrite_map.clone().unwrap_or_default();
    let contexts: Vec<_> = ctx.contexts.values().cloned().collect();
    let total = contexts.len();
    let mut queue = ExecutionQueue::build(contexts, ctx.config.output_dir());

    let mut completed = 0usize;
    loop {
        if queue.is_complete() {
            break;
        }

        while let Some(task) = queue.next() {
            let command = MasterCommand::Download {
                url: task.context.url.clone(),
                page_id: task.context.id.clone(),
                depth: task.context.depth,
                save_path: task.absolute_save_path.clone(),
                output_dir: ctx.config.output_dir().to_path_buf(),
                cookies: ctx.cookies.clone(),
                link_rewrite_map: rewrite_map.clone(),
                known_assets: ctx.hidden_files.snapshot(),
            };
            ctx.pool
                .execute(task.context.id.to_string(), TaskType::Download, &command, &ctx.bus)
                .await?;
        }

        let outcomes = ctx.pool.poll_all(&ctx.bus).await;
        if outcomes.is_empty() {
            tokio::time::sleep(Duration::from_millis(25)).await;
            continue;
        }

        for outcome in outcomes {
            match outcome {
                WorkerOutcome::Completed { data: Some(ResultData::Download(result)), .. } => {
                    for asset in &result.new_assets {
                        ctx.hidden_files.record_download(
                            &asset.url,
                            &asset.saved_path,
                            result.page_id.as_str(),
                            asset.size,
                        );
                    }
                    queue.mark_complete(&result.page_id);
                    ctx.stats.pages_downloaded += 1;
                    ctx.stats.assets_downloaded += u64::from(result.assets_downloaded);
                    completed += 1;
                    ctx.bus.emit(&OrchestratorEvent::ExecutionProgress { completed, total });
                }
                WorkerOutcome::Completed { .. } => {}
                WorkerOutcome::Failed { task_id, error } => {
                    let page_id = crate::orchestration::context::PageId::new(task_id);
                    queue.mark_failed(&page_id, error.kind);
                    ctx.stats.pages_failed += 1;
                    completed += 1;
                    ctx.bus.emit(&OrchestratorEvent::ExecutionProgress { completed, total });
                }
            }
        }
    }

    ctx.execution = Some(queue);
    Ok(PhaseOutcome::Continue)
}
