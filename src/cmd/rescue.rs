//! `strand rescue` — pick a preserved workspace back up: resume the agent
//! session in it, then reintegrate through the normal merge/push/cleanup
//! phases.

use crate::AgentOpts;
use crate::cmd::run::RunFlags;
use anyhow::Result;
use std::path::Path;
use strand::agent::{Agent, default_trust_file};
use strand::errors::LifecycleError;
use strand::exec::ProcessRunner;
use strand::lifecycle::run_rescue;
use strand::phases::PhaseEnv;
use strand::summary;
use strand::ui::{self, AutoContinue, Decision, TerminalPrompt};

pub async fn cmd_rescue(
    source_dir: &Path,
    branch: &str,
    prompt: Option<&str>,
    flags: RunFlags,
    agent_opts: &AgentOpts,
) -> Result<i32> {
    let runner = ProcessRunner;
    let agent = Agent::locate(&runner).await?;
    let decision: Box<dyn Decision> = if flags.headless {
        Box::new(AutoContinue)
    } else {
        Box::new(TerminalPrompt)
    };
    let env = PhaseEnv {
        runner: &runner,
        agent,
        decision: decision.as_ref(),
        trust_file: default_trust_file(),
    };

    let config = flags.lifecycle_config(branch, prompt, agent_opts);
    match run_rescue(config, source_dir, &env).await {
        Ok(outcome) => {
            summary::print_lifecycle(&outcome, branch);
            Ok(outcome.exit_code())
        }
        Err(err) => {
            ui::error(err.to_string());
            if matches!(err, LifecycleError::WorkspaceNotFound { .. }) {
                ui::plain("See `strand status` for live workspaces.");
            }
            Ok(1)
        }
    }
}
