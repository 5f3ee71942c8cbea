//! `strand split` and `strand group` — decompose work into streams, then
//! hand the batch to the stream runner.

use anyhow::{Context, Result, bail};
use std::path::Path;
use strand::agent::{Agent, default_trust_file};
use strand::branch::branch_for_task;
use strand::config::{ExecutionMode, RunnerOptions, StreamDescriptor};
use strand::exec::ProcessRunner;
use strand::phases::PhaseEnv;
use strand::runner::StreamRunner;
use strand::split::{group_items, split_task};
use strand::summary;
use strand::ui::{self, AutoContinue, Decision, TerminalPrompt};

pub async fn cmd_split(
    source_dir: &Path,
    task: &str,
    options: RunnerOptions,
) -> Result<i32> {
    let runner = ProcessRunner;
    let agent = Agent::locate(&runner).await?;

    let streams = match split_task(&runner, &agent, task, &options.model, source_dir).await {
        Ok(streams) => streams,
        Err(err) => {
            ui::error(err.to_string());
            ui::plain("Fall back to a single stream:");
            ui::plain(format!("  strand run {} \"{task}\"", branch_for_task(None)));
            return Ok(1);
        }
    };

    run_batch(source_dir, &runner, agent, streams, options).await
}

pub async fn cmd_group(
    source_dir: &Path,
    input: &str,
    options: RunnerOptions,
) -> Result<i32> {
    let items = read_items(input)?;
    if items.trim().is_empty() {
        bail!("No work items to group");
    }

    let runner = ProcessRunner;
    let agent = Agent::locate(&runner).await?;

    let streams = match group_items(&runner, &agent, &items, &options.model, source_dir).await {
        Ok(streams) => streams,
        Err(err) => {
            ui::error(err.to_string());
            return Ok(1);
        }
    };

    run_batch(source_dir, &runner, agent, streams, options).await
}

fn read_items(input: &str) -> Result<String> {
    if input == "-" {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
}

async fn run_batch(
    source_dir: &Path,
    runner: &ProcessRunner,
    agent: Agent,
    streams: Vec<StreamDescriptor>,
    options: RunnerOptions,
) -> Result<i32> {
    ui::info(format!("{} work stream(s) planned:", streams.len()));
    for stream in &streams {
        ui::plain(format!("  {} — {}", stream.branch, stream.title));
    }

    // Sub-invocations run this same binary.
    let self_bin = std::env::current_exe().context("Failed to resolve own executable")?;
    let decision: Box<dyn Decision> = match options.mode {
        ExecutionMode::Sequential => Box::new(TerminalPrompt),
        _ => Box::new(AutoContinue),
    };
    let env = PhaseEnv {
        runner,
        agent,
        decision: decision.as_ref(),
        trust_file: default_trust_file(),
    };

    let stream_runner = StreamRunner::new(&env, self_bin, source_dir, options);
    let outcomes = stream_runner.run(&streams).await;
    summary::print_batch(&outcomes);

    Ok(if outcomes.iter().any(|o| !o.success) { 1 } else { 0 })
}
