//! Phase 4: tear the workspace down. Never fatal — a failed removal leaves
//! the workspace behind with manual-removal guidance and must not disturb
//! whatever merge/push outcome came before it.

use crate::config::{PhaseContext, PhaseOutcome};
use crate::phases::PhaseEnv;
use crate::ui;
use crate::workspace::WorkspaceManager;

pub async fn phase_cleanup(ctx: &PhaseContext, env: &PhaseEnv<'_>) -> PhaseOutcome {
    if ctx.config.keep_workspace {
        ui::info("Skipping cleanup (--keep)");
        return PhaseOutcome::skipped();
    }

    ui::step("Phase 4: Cleanup");

    let manager = WorkspaceManager::new(env.runner, &ctx.source_dir);
    if manager.destroy(&ctx.config.branch).await {
        ui::info("Workspace removed");
        return PhaseOutcome::ok();
    }

    ui::warn("Could not remove workspace (non-critical)");
    ui::plain(format!(
        "  Remove manually: git worktree remove {} --force && git branch -d {}",
        ctx.workspace_path.display(),
        ctx.config.branch
    ));
    PhaseOutcome::degraded("Workspace removal failed")
}
