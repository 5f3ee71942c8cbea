//! Drives one stream through the full phase sequence and defines the
//! structured exit-code contract between a `strand run` sub-invocation and
//! the stream runner that spawned it.

use crate::agent::{Agent, copy_agent_settings, trust_workspace};
use crate::config::{LifecycleConfig, PhaseContext, PhaseOutcome};
use crate::errors::LifecycleError;
use crate::git::Git;
use crate::phases::{PhaseEnv, WorkOutcome, phase_cleanup, phase_merge, phase_push, phase_work};
use crate::ui;
use crate::workspace::WorkspaceManager;
use std::path::Path;

/// Exit code for a lifecycle that produced no changes. Distinct from both
/// success and failure so the stream runner can classify sub-invocations
/// without scraping diagnostic text.
pub const EXIT_NO_CHANGES: i32 = 3;

/// Terminal state of one full lifecycle run.
#[derive(Debug)]
pub enum LifecycleOutcome {
    /// Work merged into the mainline (and pushed/cleaned as configured).
    Completed {
        pushed: bool,
        cleaned: bool,
        cleanup: PhaseOutcome,
    },
    /// The agent produced nothing to integrate.
    NoChanges,
    /// Work phase finished; integration was left to a later invocation.
    WorkOnly,
}

impl LifecycleOutcome {
    /// Process exit code for a single-stream invocation.
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleOutcome::NoChanges => EXIT_NO_CHANGES,
            _ => 0,
        }
    }
}

/// Run the phases in order for one stream. Phases never start before the
/// prior phase's outcome is known; a cleanup failure is reported inside
/// `Completed` rather than replacing it.
pub async fn run_lifecycle(
    config: LifecycleConfig,
    source_dir: &Path,
    env: &PhaseEnv<'_>,
) -> Result<LifecycleOutcome, LifecycleError> {
    let work_only = config.work_only;

    let ctx: PhaseContext = match phase_work(config, source_dir, env).await? {
        WorkOutcome::Proceed(ctx) => ctx,
        WorkOutcome::NoChanges => return Ok(LifecycleOutcome::NoChanges),
    };

    if work_only {
        return Ok(LifecycleOutcome::WorkOnly);
    }

    phase_merge(&ctx, env).await?;
    let push = phase_push(&ctx, env).await?;
    let cleanup = phase_cleanup(&ctx, env).await;

    Ok(LifecycleOutcome::Completed {
        pushed: push.success && !push.skipped,
        cleaned: cleanup.success && !cleanup.skipped,
        cleanup,
    })
}

/// Re-enter a preserved workspace: resume the agent session in it (fresh
/// session when there is nothing to continue), then integrate through the
/// normal merge/push/cleanup phases.
///
/// The nothing-to-merge path never tears the workspace down; it was
/// preserved on purpose.
pub async fn run_rescue(
    config: LifecycleConfig,
    source_dir: &Path,
    env: &PhaseEnv<'_>,
) -> Result<LifecycleOutcome, LifecycleError> {
    let manager = WorkspaceManager::new(env.runner, source_dir);
    let Some(workspace_path) = manager.locate(&config.branch).await else {
        return Err(LifecycleError::WorkspaceNotFound {
            branch: config.branch.clone(),
        });
    };

    let git = Git::new(env.runner);
    let source_branch = git
        .current_branch(source_dir)
        .await
        .map_err(LifecycleError::Other)?;
    if source_branch.is_empty() || source_branch == "HEAD" {
        return Err(LifecycleError::BranchUnresolvable);
    }

    // Settings and trust may be stale or missing in a long-preserved
    // workspace; re-propagate them before the session starts.
    if let Err(err) = copy_agent_settings(source_dir, &workspace_path) {
        ui::warn(format!("Could not copy agent settings: {err}"));
    }
    if let Some(trust_file) = &env.trust_file
        && let Err(err) = trust_workspace(&workspace_path, trust_file)
    {
        ui::warn(format!("Could not mark workspace trusted: {err}"));
    }

    ui::step(format!("Resuming agent in {}", workspace_path.display()));
    let mut argv = Agent::build_args(&config);
    argv.push("--continue".into());
    let exit = env
        .agent
        .run_session(env.runner, &argv, &workspace_path)
        .await;
    if exit != 0 {
        // No prior session to continue, most likely. Start fresh.
        ui::warn("Could not resume previous session; starting a fresh one");
        let argv = Agent::build_args(&config);
        let exit = env
            .agent
            .run_session(env.runner, &argv, &workspace_path)
            .await;
        if exit != 0 && !config.headless && !env.decision.confirm("Continue to merge?", false) {
            return Err(LifecycleError::Aborted {
                workspace: workspace_path,
            });
        }
    }

    let source_head = git.rev_parse("HEAD", source_dir).await;
    let workspace_head = git.rev_parse("HEAD", &workspace_path).await;
    if source_head == workspace_head {
        if git.has_uncommitted_changes(&workspace_path).await {
            return Err(LifecycleError::DirtyWorkspace {
                workspace: workspace_path,
            });
        }
        ui::warn("No new commits on workspace branch — nothing to merge");
        return Ok(LifecycleOutcome::NoChanges);
    }

    let ctx = PhaseContext {
        config,
        source_dir: source_dir.to_path_buf(),
        source_branch,
        workspace_path,
    };

    phase_merge(&ctx, env).await?;
    let push = phase_push(&ctx, env).await?;
    let cleanup = phase_cleanup(&ctx, env).await;

    Ok(LifecycleOutcome::Completed {
        pushed: push.success && !push.skipped,
        cleaned: cleanup.success && !cleanup.skipped,
        cleanup,
    })
}
