//! User Confirmation phase (spec.md §4.13): renders the discovered tree
//! with cycle markers and asks for a yes/no. A no-op under `--dry-run`.

use crate::orchestration::context::{EdgeKind, PageId};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::orchestrator::{OrchestratorContext, PhaseOutcome};

fn render_tree(ctx: &OrchestratorContext, id: &PageId, depth: usize, out: &mut String) {
    let Some(page) = ctx.contexts.get(id) else { return };
    let label = page.resolved_title.as_deref().unwrap_or(page.url.as_str());
    out.push_str(&"  ".repeat(depth));
    out.push_str("- ");
    out.push_str(label);
    out.push('\n');
    for child in &page.children {
        render_tree(ctx, child, depth + 1, out);
    }
}

fn cycle_markers(ctx: &OrchestratorContext) -> Vec<String> {
    ctx.graph
        .edges()
        .iter()
        .filter(|e| matches!(e.kind, EdgeKind::Back { .. }))
        .map(|e| format!("{} -> {} (cycle)", e.source, e.target))
        .collect()
}

pub async fn run(ctx: &mut OrchestratorContext) -> Result<PhaseOutcome, OrchestratorError> {
    if ctx.config.dry_run() {
        return Ok(PhaseOutcome::Continue);
    }

    let root_id = crate::orchestration::context::PageId::new(
        crate::orchestration::page_identity::extract_canonical_id(ctx.config.root_url()),
    );
    let mut tree = String::new();
    render_tree(ctx, &root_id, 0, &mut tree);
    for marker in cycle_markers(ctx) {
        tree.push_str(&marker);
        tree.push('\n');
    }

    println!("Discovered {} pages:\n{}", ctx.contexts.len(), tree);
    println!("Proceed with download? [y/N]");

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(OrchestratorError::WorkerIo)?;

    if input.trim().eq_ignore_ascii_case("y") {
        Ok(PhaseOutcome::Continue)
    } else {
        Ok(PhaseOutcome::Aborted)
    }
}
