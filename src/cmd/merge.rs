//! `strand merge` — reintegrate existing stream branches, in order, into
//! the current branch. The recovery path for work-only runs and for
//! streams whose reconciliation failed.

use anyhow::{Result, bail};
use std::path::Path;
use strand::agent::{Agent, default_trust_file};
use strand::config::{LifecycleConfig, PhaseContext};
use strand::exec::ProcessRunner;
use strand::git::Git;
use strand::phases::{PhaseEnv, phase_cleanup, phase_merge, phase_push};
use strand::ui::{self, TerminalPrompt};
use strand::workspace::WorkspaceManager;

pub async fn cmd_merge(
    source_dir: &Path,
    branches: &[String],
    no_push: bool,
    keep: bool,
) -> Result<i32> {
    let runner = ProcessRunner;
    let agent = Agent::locate(&runner).await?;
    let decision = TerminalPrompt;
    let env = PhaseEnv {
        runner: &runner,
        agent,
        decision: &decision,
        trust_file: default_trust_file(),
    };

    let git = Git::new(&runner);
    let source_branch = git.current_branch(source_dir).await?;
    if source_branch.is_empty() || source_branch == "HEAD" {
        bail!("Cannot determine current branch (detached HEAD?)");
    }

    let manager = WorkspaceManager::new(&runner, source_dir);
    let mut failed = 0usize;

    for branch in branches {
        let Some(workspace_path) = manager.locate(branch).await else {
            ui::error(format!("No workspace found for {branch}"));
            failed += 1;
            continue;
        };

        let ctx = PhaseContext {
            config: LifecycleConfig {
                branch: branch.clone(),
                skip_push: no_push,
                keep_workspace: keep,
                ..Default::default()
            },
            source_dir: source_dir.to_path_buf(),
            source_branch: source_branch.clone(),
            workspace_path,
        };

        if let Err(err) = phase_merge(&ctx, &env).await {
            ui::error(format!("{branch}: {err}"));
            failed += 1;
            continue;
        }
        if let Err(err) = phase_push(&ctx, &env).await {
            ui::error(format!("{branch}: {err}"));
            failed += 1;
            continue;
        }
        phase_cleanup(&ctx, &env).await;
        ui::info(format!("{branch}: merged"));
    }

    Ok(if failed > 0 { 1 } else { 0 })
}
