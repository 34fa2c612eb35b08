//! Conflict Resolution phase (spec.md §4.13): pure and synchronous, no
//! worker involvement. Builds the canonical context set and the
//! link-rewrite map consumed by the Download phase.

use crate::orchestration::conflict_resolver;
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    let contexts: Vec<_> = ctx.contexts.values().cloned().collect();
    let resolution = conflict_resolver::resolve(contexts, &ctx.titles);

    ctx.contexts.clear();
    for canonical in resolution.canonical {
        ctx.contexts.insert(canonical.id.clone(), canonical);
    }
    ctx.rewrite_map = Some(resolution.rewrite_map);

    Ok(PhaseOutcome::Continue)
}
