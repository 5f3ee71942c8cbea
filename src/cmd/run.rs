//! `strand run` — one work stream through the full lifecycle.

use crate::AgentOpts;
use anyhow::Result;
use std::path::Path;
use strand::agent::{Agent, default_trust_file};
use strand::branch::branch_for_task;
use strand::config::LifecycleConfig;
use strand::exec::ProcessRunner;
use strand::lifecycle::run_lifecycle;
use strand::phases::PhaseEnv;
use strand::summary;
use strand::ui::{self, AutoContinue, Decision, TerminalPrompt};

/// Lifecycle flags shared by `run` and `rescue`.
#[derive(Debug, Clone, Default)]
pub struct RunFlags {
    pub headless: bool,
    pub work_only: bool,
    pub from: Option<String>,
    pub no_push: bool,
    pub keep: bool,
}

impl RunFlags {
    pub fn lifecycle_config(
        &self,
        branch: &str,
        prompt: Option<&str>,
        agent: &AgentOpts,
    ) -> LifecycleConfig {
        LifecycleConfig {
            branch: branch.to_string(),
            prompt: prompt.unwrap_or_default().to_string(),
            headless: self.headless,
            model: agent.model.clone().unwrap_or_default(),
            max_budget_usd: agent.max_budget_usd.clone().unwrap_or_default(),
            permission_mode: agent.permission_mode.clone().unwrap_or_default(),
            from_ref: self.from.clone().unwrap_or_default(),
            skip_push: self.no_push,
            keep_workspace: self.keep,
            work_only: self.work_only,
            agent_flags: agent.agent_flags.clone(),
        }
    }
}

pub async fn cmd_run(
    source_dir: &Path,
    branch: Option<&str>,
    prompt: Option<&str>,
    flags: RunFlags,
    agent_opts: &AgentOpts,
) -> Result<i32> {
    let branch = match branch {
        Some(name) => name.to_string(),
        None => {
            let name = branch_for_task(None);
            ui::info(format!("Auto-named branch: {name}"));
            name
        }
    };

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

    let config = flags.lifecycle_config(&branch, prompt, agent_opts);
    match run_lifecycle(config, source_dir, &env).await {
        Ok(outcome) => {
            summary::print_lifecycle(&outcome, &branch);
            Ok(outcome.exit_code())
        }
        Err(err) => {
            ui::error(err.to_string());
            Ok(1)
        }
    }
}
