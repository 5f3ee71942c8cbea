//! Phase 3: publish the merged mainline. Exactly one attempt, no retry;
//! the error message carries the manual retry command.

use crate::config::{PhaseContext, PhaseOutcome};
use crate::errors::LifecycleError;
use crate::git::Git;
use crate::phases::PhaseEnv;
use crate::ui;

pub async fn phase_push(
    ctx: &PhaseContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, LifecycleError> {
    if ctx.config.skip_push {
        ui::info("Skipping push (--no-push)");
        return Ok(PhaseOutcome::skipped());
    }

    ui::step("Phase 3: Push");

    if Git::new(env.runner).push(&ctx.source_dir).await {
        ui::info("Pushed successfully");
        return Ok(PhaseOutcome::ok());
    }

    Err(LifecycleError::PublishFailed {
        source_dir: ctx.source_dir.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::LifecycleConfig;
    use crate::exec::testing::ScriptedRunner;
    use crate::ui::testing::FixedDecision;
    use std::path::PathBuf;

    fn ctx(skip_push: bool) -> PhaseContext {
        PhaseContext {
            config: LifecycleConfig {
                branch: "strand/x-1a2b".into(),
                skip_push,
                ..Default::default()
            },
            source_dir: PathBuf::from("/repo"),
            source_branch: "main".into(),
            workspace_path: PathBuf::from("/strand-x-1a2b"),
        }
    }

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

    #[tokio::test]
    async fn disabled_push_is_skipped_not_failed() {
        let runner = ScriptedRunner::new();
        let decision = FixedDecision::new(false);

        let outcome = phase_push(&ctx(true), &env(&runner, &decision))
            .await
            .unwrap();
        assert!(outcome.success && outcome.skipped);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_push() {
        let runner = ScriptedRunner::new();
        runner.push_ok("");
        let decision = FixedDecision::new(false);

        let outcome = phase_push(&ctx(false), &env(&runner, &decision))
            .await
            .unwrap();
        assert!(outcome.success && !outcome.skipped);
        assert_eq!(runner.calls()[0].args, vec!["push"]);
    }

    #[tokio::test]
    async fn failed_push_is_fatal_with_single_attempt() {
        let runner = ScriptedRunner::new();
        runner.push_fail("remote: rejected\n");
        let decision = FixedDecision::new(false);

        let err = phase_push(&ctx(false), &env(&runner, &decision))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PublishFailed { .. }));
        // No automatic retry.
        assert_eq!(runner.calls().len(), 1);
    }
}
