//! Stream runner: executes a batch of streams as sub-invocations of this
//! binary, then serially reconciles the survivors against the single
//! shared mainline.
//!
//! Work phases are the parallelizable part — each runs in its own
//! workspace and cannot touch the others. Integration is not: every merge
//! and push mutates the one mainline checkout, so reconciliation is always
//! serial regardless of how the work ran.
//!
//! Sub-invocations report through exit codes, not text: 0 means work is
//! waiting on a branch, [`EXIT_NO_CHANGES`] means the stream produced
//! nothing (benign), anything else is a failure. One stream's outcome never
//! interrupts another's execution.

use crate::config::{
    ExecutionMode, PhaseContext, RunnerOptions, StreamDescriptor, StreamOutcome,
};
use crate::git::Git;
use crate::lifecycle::EXIT_NO_CHANGES;
use crate::phases::{PhaseEnv, phase_cleanup, phase_merge, phase_push};
use crate::ui;
use crate::workspace::WorkspaceManager;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static ANSI_SEQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("static pattern"));

const REASON_MAX_LEN: usize = 100;

/// Short human-readable reason pulled from a sub-invocation's trailing
/// diagnostics: the last non-empty stderr line with ANSI sequences and
/// progress prefixes stripped.
fn short_reason(stderr: &str) -> Option<String> {
    for line in stderr.lines().rev() {
        let clean = ANSI_SEQ.replace_all(line, "");
        let clean = clean
            .trim()
            .trim_start_matches("==>")
            .trim_start_matches("[OK]")
            .trim_start_matches("[!]")
            .trim_start_matches("[x]")
            .trim();
        if !clean.is_empty() {
            return Some(clean.chars().take(REASON_MAX_LEN).collect());
        }
    }
    None
}

pub struct StreamRunner<'a> {
    env: &'a PhaseEnv<'a>,
    /// Our own executable, for sub-invocations. Resolved by the caller;
    /// the runner never inspects `argv[0]` itself.
    self_bin: PathBuf,
    /// The shared mainline checkout.
    source_dir: PathBuf,
    options: RunnerOptions,
}

impl<'a> StreamRunner<'a> {
    pub fn new(
        env: &'a PhaseEnv<'a>,
        self_bin: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            env,
            self_bin: self_bin.into(),
            source_dir: source_dir.into(),
            options,
        }
    }

    /// Execute every stream per the configured mode, then (except for
    /// detached launches) reconcile the successful ones serially.
    pub async fn run(&self, streams: &[StreamDescriptor]) -> Vec<StreamOutcome> {
        match self.options.mode {
            ExecutionMode::Parallel => {
                let mut outcomes = self.run_parallel(streams).await;
                self.reconcile(&mut outcomes).await;
                outcomes
            }
            ExecutionMode::Sequential => {
                let mut outcomes = self.run_sequential(streams).await;
                self.reconcile(&mut outcomes).await;
                outcomes
            }
            ExecutionMode::Detached => self.run_detached(streams),
        }
    }

    /// Argument vector for one sub-invocation of `strand run`.
    fn child_args(&self, stream: &StreamDescriptor, work_only: bool, headless: bool) -> Vec<String> {
        let mut argv = vec![
            "run".to_string(),
            stream.prompt.clone(),
            "--branch".to_string(),
            stream.branch.clone(),
        ];
        if headless {
            argv.push("--headless".into());
        }
        if work_only {
            argv.push("--work-only".into());
        }
        if !self.options.model.is_empty() {
            argv.push("--model".into());
            argv.push(self.options.model.clone());
        }
        if !self.options.max_budget_usd.is_empty() {
            argv.push("--max-budget-usd".into());
            argv.push(self.options.max_budget_usd.clone());
        }
        if !self.options.permission_mode.is_empty() {
            argv.push("--permission-mode".into());
            argv.push(self.options.permission_mode.clone());
        }
        if !self.options.from_ref.is_empty() {
            argv.push("--from".into());
            argv.push(self.options.from_ref.clone());
        }
        if self.options.keep_workspace {
            argv.push("--keep".into());
        }
        if !work_only && self.options.skip_push {
            argv.push("--no-push".into());
        }
        if !self.options.agent_flags.is_empty() {
            argv.push("--".into());
            argv.extend(self.options.agent_flags.iter().cloned());
        }
        argv
    }

    fn self_bin_str(&self) -> String {
        self.self_bin.to_string_lossy().into_owned()
    }

    /// All work phases at once, headless, each joined independently. A
    /// panicking or failing stream never takes the others down with it.
    async fn run_parallel(&self, streams: &[StreamDescriptor]) -> Vec<StreamOutcome> {
        ui::step(format!(
            "Launching {} parallel work stream(s)...",
            streams.len()
        ));
        for stream in streams {
            ui::plain(format!("  {} → {}", stream.title, stream.branch));
        }

        let bin = self.self_bin_str();
        let children = streams.iter().map(|stream| {
            let args = self.child_args(stream, true, true);
            let bin = bin.clone();
            async move {
                let output = self.env.runner.run(&bin, &args, Some(&self.source_dir)).await;
                (stream.clone(), output)
            }
        });

        futures::future::join_all(children)
            .await
            .into_iter()
            .map(|(stream, output)| {
                let mut outcome = StreamOutcome::new(stream);
                match output.exit_code {
                    0 => outcome.success = true,
                    EXIT_NO_CHANGES => {
                        outcome.success = true;
                        outcome.skipped = true;
                        outcome.reason = short_reason(&output.stderr);
                    }
                    code => {
                        outcome.error = Some(
                            short_reason(&output.stderr)
                                .unwrap_or_else(|| format!("exited with code {code}")),
                        );
                    }
                }
                outcome
            })
            .collect()
    }

    /// One interactive work phase at a time, in input order. The child owns
    /// the terminal, so classification has only the exit code to go on.
    async fn run_sequential(&self, streams: &[StreamDescriptor]) -> Vec<StreamOutcome> {
        let bin = self.self_bin_str();
        let mut outcomes = Vec::with_capacity(streams.len());

        for (idx, stream) in streams.iter().enumerate() {
            ui::step(format!(
                "Stream {}/{}: {}",
                idx + 1,
                streams.len(),
                stream.title
            ));
            let args = self.child_args(stream, true, false);
            let code = self
                .env
                .runner
                .run_interactive(&bin, &args, Some(&self.source_dir))
                .await;

            let mut outcome = StreamOutcome::new(stream.clone());
            match code {
                0 => outcome.success = true,
                EXIT_NO_CHANGES => {
                    outcome.success = true;
                    outcome.skipped = true;
                }
                code => outcome.error = Some(format!("exited with code {code}")),
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Fire and forget: each stream gets a full standalone lifecycle in a
    /// background process. No outcome aggregation beyond launch success.
    fn run_detached(&self, streams: &[StreamDescriptor]) -> Vec<StreamOutcome> {
        let bin = self.self_bin_str();
        streams
            .iter()
            .map(|stream| {
                let args = self.child_args(stream, false, true);
                let mut outcome = StreamOutcome::new(stream.clone());
                match self
                    .env
                    .runner
                    .spawn_detached(&bin, &args, Some(&self.source_dir))
                {
                    Ok(pid) => {
                        ui::info(format!("Launched {} (pid {pid})", outcome.stream.branch));
                        outcome.success = true;
                        outcome.reason = Some(format!("launched (pid {pid})"));
                    }
                    Err(err) => {
                        ui::error(format!("Failed to launch {}: {err}", outcome.stream.branch));
                        outcome.error = Some(err.to_string());
                    }
                }
                outcome
            })
            .collect()
    }

    /// Merge, push, and tear down each successful stream's branch, one at a
    /// time. A failed stream is recorded and the loop moves on; its
    /// workspace stays intact for manual recovery.
    async fn reconcile(&self, outcomes: &mut [StreamOutcome]) {
        if !outcomes.iter().any(|o| o.success && !o.skipped) {
            return;
        }

        ui::step("Reconciling completed streams...");
        let git = Git::new(self.env.runner);
        let source_branch = match git.current_branch(&self.source_dir).await {
            Ok(branch) if !branch.is_empty() && branch != "HEAD" => branch,
            Ok(_) | Err(_) => {
                for outcome in outcomes.iter_mut().filter(|o| o.success && !o.skipped) {
                    outcome.success = false;
                    outcome.error = Some("could not resolve the mainline branch".into());
                }
                return;
            }
        };

        let manager = WorkspaceManager::new(self.env.runner, &self.source_dir);
        for outcome in outcomes.iter_mut().filter(|o| o.success && !o.skipped) {
            let config = self.options.lifecycle_config(&outcome.stream);
            let Some(workspace_path) = manager.locate(&config.branch).await else {
                outcome.success = false;
                outcome.error = Some(format!("no workspace found for {}", config.branch));
                continue;
            };

            let ctx = PhaseContext {
                config,
                source_dir: self.source_dir.clone(),
                source_branch: source_branch.clone(),
                workspace_path,
            };

            if let Err(err) = phase_merge(&ctx, self.env).await {
                ui::error(format!("{}: {err}", ctx.config.branch));
                outcome.success = false;
                outcome.error = Some(err.to_string());
                continue;
            }
            outcome.merged = true;

            match phase_push(&ctx, self.env).await {
                Ok(push) => outcome.pushed = push.success && !push.skipped,
                Err(err) => {
                    ui::error(format!("{}: {err}", ctx.config.branch));
                    outcome.success = false;
                    outcome.error = Some(err.to_string());
                    continue;
                }
            }

            let cleanup = phase_cleanup(&ctx, self.env).await;
            outcome.cleaned = cleanup.success && !cleanup.skipped;
        }
    }
}
