//! `strand delete` — drop stream branches and their workspaces without
//! integrating anything.

use anyhow::Result;
use std::path::Path;
use strand::branch::{BRANCH_NAMESPACE, in_namespace};
use strand::exec::ProcessRunner;
use strand::git::Git;
use strand::ui;
use strand::workspace::WorkspaceManager;

pub async fn cmd_delete(source_dir: &Path, branches: &[String], force: bool) -> Result<i32> {
    let runner = ProcessRunner;
    let git = Git::new(&runner);
    let manager = WorkspaceManager::new(&runner, source_dir);
    let mut failed = 0usize;

    for branch in branches {
        // Branches outside our namespace are someone else's; deleting them
        // takes an explicit --force.
        if !in_namespace(branch) && !force {
            ui::warn(format!(
                "{branch} is outside the {BRANCH_NAMESPACE}/ namespace — skipping (use --force)"
            ));
            failed += 1;
            continue;
        }

        let had_workspace = manager.exists(branch).await;
        if had_workspace && !manager.destroy(branch).await {
            ui::error(format!("Could not remove workspace for {branch}"));
            failed += 1;
            continue;
        }

        // destroy() only attempts a safe branch delete; finish the job if
        // the branch is still around.
        if git.branch_exists(branch, source_dir).await
            && !git.delete_branch(branch, force, source_dir).await
        {
            ui::error(format!(
                "Could not delete {branch} (unmerged commits? use --force)"
            ));
            failed += 1;
            continue;
        }

        ui::info(format!("Deleted {branch}"));
    }

    Ok(if failed > 0 { 1 } else { 0 })
}
