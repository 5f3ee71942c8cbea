//! Phase 1: materialize the workspace and execute the agent in it.
//!
//! Ends in one of three ways:
//! - new commits exist → a live [`PhaseContext`] for the merge phase
//! - head unchanged and workspace clean → [`WorkOutcome::NoChanges`], the
//!   workspace is torn down unless teardown is disabled
//! - head unchanged but uncommitted changes exist → abort with the
//!   workspace preserved; auto-discarding here would lose the only copy

use crate::agent::{Agent, copy_agent_settings, trust_workspace};
use crate::config::{LifecycleConfig, PhaseContext};
use crate::errors::LifecycleError;
use crate::git::Git;
use crate::phases::{PhaseEnv, phase_cleanup};
use crate::ui;
use crate::workspace::WorkspaceManager;
use std::path::Path;

/// Terminal outcome of the work phase.
#[derive(Debug)]
pub enum WorkOutcome {
    /// The workspace holds new commits; proceed to integration.
    Proceed(PhaseContext),
    /// Nothing was produced. Benign; nothing to integrate.
    NoChanges,
}

pub async fn phase_work(
    config: LifecycleConfig,
    source_dir: &Path,
    env: &PhaseEnv<'_>,
) -> Result<WorkOutcome, LifecycleError> {
    ui::step("Phase 1: Work");

    let git = Git::new(env.runner);
    let source_branch = git
        .current_branch(source_dir)
        .await
        .map_err(LifecycleError::Other)?;
    if source_branch.is_empty() || source_branch == "HEAD" {
        return Err(LifecycleError::BranchUnresolvable);
    }
    ui::plain(format!("Source branch: {source_branch}"));

    ui::step(format!("Creating workspace for branch: {}", config.branch));
    let manager = WorkspaceManager::new(env.runner, source_dir);
    let from_ref = (!config.from_ref.is_empty()).then_some(config.from_ref.as_str());
    let workspace_path = manager.materialize(&config.branch, from_ref).await?;
    ui::plain(format!("Workspace path: {}", workspace_path.display()));

    // The workspace inherits the mainline's agent settings and is marked
    // trusted so the agent starts without a dialog.
    if let Err(err) = copy_agent_settings(source_dir, &workspace_path) {
        ui::warn(format!("Could not copy agent settings: {err}"));
    }
    if let Some(trust_file) = &env.trust_file
        && let Err(err) = trust_workspace(&workspace_path, trust_file)
    {
        ui::warn(format!("Could not mark workspace trusted: {err}"));
    }

    let argv = Agent::build_args(&config);
    ui::step("Starting agent in workspace...");
    let exit = env
        .agent
        .run_session(env.runner, &argv, &workspace_path)
        .await;

    // The agent's exit code is advisory: confirm in interactive mode,
    // continue automatically in headless mode.
    if exit != 0 {
        ui::warn(format!("Agent exited with code {exit}"));
        if !config.headless && !env.decision.confirm("Continue to merge?", false) {
            return Err(LifecycleError::Aborted {
                workspace: workspace_path,
            });
        }
    }

    let source_head = git.rev_parse("HEAD", source_dir).await;
    let workspace_head = git.rev_parse("HEAD", &workspace_path).await;

    let ctx = PhaseContext {
        config,
        source_dir: source_dir.to_path_buf(),
        source_branch,
        workspace_path,
    };

    if source_head == workspace_head {
        if git.has_uncommitted_changes(&ctx.workspace_path).await {
            return Err(LifecycleError::DirtyWorkspace {
                workspace: ctx.workspace_path,
            });
        }
        ui::warn("No new commits on workspace branch — nothing to merge");
        if !ctx.config.keep_workspace {
            phase_cleanup(&ctx, env).await;
        }
        return Ok(WorkOutcome::NoChanges);
    }

    Ok(WorkOutcome::Proceed(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::ui::testing::FixedDecision;

    const WT_LIST: &str = "worktree /repo\nHEAD abc\nbranch refs/heads/main\n\nworktree /strand-x-1a2b\nHEAD def\nbranch refs/heads/strand/x-1a2b\n\n";

    fn env<'a>(runner: &'a ScriptedRunner, decision: &'a FixedDecision) -> PhaseEnv<'a> {
        PhaseEnv {
            runner,
            agent: Agent {
                command: "claude".into(),
            },
            decision,
            trust_file: None,
        }
    }

    fn config(headless: bool) -> LifecycleConfig {
        LifecycleConfig {
            branch: "strand/x-1a2b".into(),
            prompt: "do the work".into(),
            headless,
            ..Default::default()
        }
    }

    /// Scripts the materialize sequence: branch lookup, worktree add,
    /// registry resolve.
    fn script_materialize(runner: &ScriptedRunner) {
        runner
            .push_ok("main\n") // branch --show-current
            .push_ok("/repo\n") // rev-parse --show-toplevel
            .push_ok("") // worktree add -b
            .push_ok(WT_LIST); // locate
    }

    #[tokio::test]
    async fn detached_head_is_unresolvable() {
        let runner = ScriptedRunner::new();
        runner.push_ok("").push_ok("HEAD\n");
        let decision = FixedDecision::new(false);

        let err = phase_work(config(true), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::BranchUnresolvable));
    }

    #[tokio::test]
    async fn new_commits_proceed_with_context() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(0); // agent session
        runner.push_ok("aaa\n").push_ok("bbb\n"); // heads differ

        let decision = FixedDecision::new(false);
        let outcome = phase_work(config(true), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap();

        match outcome {
            WorkOutcome::Proceed(ctx) => {
                assert_eq!(ctx.source_branch, "main");
                assert_eq!(ctx.workspace_path, Path::new("/strand-x-1a2b"));
                assert_eq!(ctx.config.branch, "strand/x-1a2b");
            }
            other => panic!("expected Proceed, got {other:?}"),
        }
        assert_eq!(decision.times_asked(), 0);
    }

    #[tokio::test]
    async fn unchanged_head_and_clean_tree_is_no_changes_with_teardown() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(0);
        runner
            .push_ok("aaa\n")
            .push_ok("aaa\n") // heads equal
            .push_ok("") // status --porcelain: clean
            .push_ok("/repo\n") // cleanup: rev-parse --show-toplevel
            .push_ok("") // worktree remove
            .push_ok(""); // branch -d

        let decision = FixedDecision::new(false);
        let outcome = phase_work(config(true), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap();
        assert!(matches!(outcome, WorkOutcome::NoChanges));

        // Teardown actually ran.
        let removed = runner
            .calls()
            .iter()
            .any(|c| c.args.first().map(String::as_str) == Some("worktree") && c.args[1] == "remove");
        assert!(removed);
    }

    #[tokio::test]
    async fn unchanged_head_with_keep_workspace_skips_teardown() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(0);
        runner.push_ok("aaa\n").push_ok("aaa\n").push_ok("");

        let mut cfg = config(true);
        cfg.keep_workspace = true;
        let decision = FixedDecision::new(false);
        let outcome = phase_work(cfg, Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap();
        assert!(matches!(outcome, WorkOutcome::NoChanges));
        assert!(
            !runner
                .calls()
                .iter()
                .any(|c| c.args.first().map(String::as_str) == Some("worktree")
                    && c.args[1] == "remove")
        );
    }

    #[tokio::test]
    async fn unchanged_head_with_dirty_tree_preserves_workspace() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(0);
        runner
            .push_ok("aaa\n")
            .push_ok("aaa\n")
            .push_ok(" M src/a.rs\n"); // dirty

        let decision = FixedDecision::new(false);
        let err = phase_work(config(true), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap_err();
        match err {
            LifecycleError::DirtyWorkspace { workspace } => {
                assert_eq!(workspace, Path::new("/strand-x-1a2b"));
            }
            other => panic!("expected DirtyWorkspace, got {other:?}"),
        }
        // No teardown on the data-loss path.
        assert!(
            !runner
                .calls()
                .iter()
                .any(|c| c.args.first().map(String::as_str) == Some("worktree")
                    && c.args[1] == "remove")
        );
    }

    #[tokio::test]
    async fn nonzero_agent_exit_interactive_decline_aborts() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(2);

        let decision = FixedDecision::new(false);
        let err = phase_work(config(false), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Aborted { .. }));
        assert_eq!(decision.times_asked(), 1);
    }

    #[tokio::test]
    async fn nonzero_agent_exit_headless_continues_without_asking() {
        let runner = ScriptedRunner::new();
        script_materialize(&runner);
        runner.push_interactive(2);
        runner.push_ok("aaa\n").push_ok("bbb\n");

        let decision = FixedDecision::new(false);
        let outcome = phase_work(config(true), Path::new("/repo"), &env(&runner, &decision))
            .await
            .unwrap();
        assert!(matches!(outcome, WorkOutcome::Proceed(_)));
        assert_eq!(decision.times_asked(), 0);
    }
}
