//! Complete phase (spec.md §4.13): renders final stats, and the partial
//! tree if the run was aborted during User Confirmation.

use crate::orchestration::error::OrchestratorError;
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    let stats = &ctx.stats;
    if stats.aborted {
        tracing::info!(
            discovered = stats.pages_discovered,
            "run aborted before download; rendering partial discovery tree"
        );
        for page in ctx.contexts.values() {
            let label = page.resolved_title.as_deref().unwrap_or(page.url.as_str());
            println!("{}- {label}", "  ".repeat(page.depth as usize));
        }
    } else {
        println!(
            "discovered {} / downloaded {} / failed {} / assets {}",
            stats.pages_discovered, stats.pages_downloaded, stats.pages_failed, stats.assets_downloaded
        );
    }

    Ok(PhaseOutcome::Continue)
}
