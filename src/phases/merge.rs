//! Phase 2: integrate the stream's branch back into the mainline.
//!
//! One merge invocation style throughout: `git merge <branch> --no-edit
//! --autostash`. On failure the unmerged-path scan decides the route: zero
//! conflicted paths means a non-conflict failure (dirty mainline, unrelated
//! histories) which is aborted and fatal; conflicted paths get one
//! interactive agent pass in the mainline directory, then a re-scan decides
//! success. Integration succeeds if and only if the final conflicted-path
//! count is zero.

use crate::config::{PhaseContext, PhaseOutcome};
use crate::errors::LifecycleError;
use crate::git::Git;
use crate::phases::PhaseEnv;
use crate::ui;

fn conflict_prompt(files: &[String]) -> String {
    format!(
        "There are git merge conflicts that need resolving. The following files have conflicts:\n\n\
         {}\n\n\
         Please resolve all merge conflicts in these files. For each file:\n\
         1. Open the file and find the conflict markers (<<<<<<< ======= >>>>>>>)\n\
         2. Resolve each conflict by choosing the correct code or combining changes\n\
         3. Remove all conflict markers, then stage the resolved files with git add\n\
         4. Run 'git commit --no-edit' to complete the merge without changing its message.",
        files.join("\n")
    )
}

pub async fn phase_merge(
    ctx: &PhaseContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, LifecycleError> {
    ui::step("Phase 2: Merge");
    ui::plain(format!(
        "Merging {} into {}...",
        ctx.config.branch, ctx.source_branch
    ));

    let git = Git::new(env.runner);
    let attempt = git.merge(&ctx.config.branch, &ctx.source_dir).await;

    if attempt.success {
        ui::info("Merge successful");
        return Ok(PhaseOutcome::ok());
    }

    ui::warn("Merge failed");
    if !attempt.output.trim().is_empty() {
        ui::plain(attempt.output.trim());
    }

    let unmerged = git.unmerged_files(&ctx.source_dir).await;
    if unmerged.is_empty() {
        ui::error("No unmerged files detected. Aborting merge.");
        git.abort_merge(&ctx.source_dir).await;
        return Err(LifecycleError::IntegrationFailed {
            workspace: ctx.workspace_path.clone(),
        });
    }

    ui::warn("Merge conflicts detected");
    ui::plain("Unmerged files:");
    for file in &unmerged {
        ui::plain(file);
    }

    // Conflict resolution is always an interactive session, and it runs in
    // the mainline directory where the half-finished merge lives.
    ui::step("Starting agent to resolve conflicts (interactive)...");
    let prompt = conflict_prompt(&unmerged);
    env.agent
        .run_session(env.runner, &[prompt], &ctx.source_dir)
        .await;

    let remaining = git.unmerged_files(&ctx.source_dir).await;
    if !remaining.is_empty() {
        ui::error("Unresolved conflicts remain:");
        for file in &remaining {
            ui::plain(file);
        }
        return Err(LifecycleError::IntegrationConflict {
            files: remaining,
            source_dir: ctx.source_dir.clone(),
            workspace: ctx.workspace_path.clone(),
        });
    }

    ui::info("Conflicts resolved and merge completed");
    Ok(PhaseOutcome::ok())
}
