//! Configuration and outcome types threaded through the orchestrator.
//!
//! Everything the phase orchestrator and stream runner need is carried in
//! these structs. Neither component reads the current working directory,
//! argv, or any other ambient process state — the command layer resolves
//! those once and passes them down.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters for one stream lifecycle. Immutable once constructed.
#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    /// Branch the workspace is bound to.
    pub branch: String,
    /// Task prompt handed to the agent. Empty → fresh interactive session.
    pub prompt: String,
    /// Headless (`-p`) agent invocation instead of an interactive session.
    pub headless: bool,
    /// Agent model override.
    pub model: String,
    /// Cost ceiling handed to the agent (enforced by the agent, not by us).
    pub max_budget_usd: String,
    /// Agent permission mode override.
    pub permission_mode: String,
    /// Base ref for the new workspace branch.
    pub from_ref: String,
    /// Skip the publish phase.
    pub skip_push: bool,
    /// Keep the workspace after a successful merge (and on no-op exits).
    pub keep_workspace: bool,
    /// Stop after the work phase; merge/push/teardown are left to a later
    /// invocation (the stream runner relies on this).
    pub work_only: bool,
    /// Flags appended verbatim to the agent command line.
    pub agent_flags: Vec<String>,
}

/// One independent unit of work produced by the task source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    pub title: String,
    pub prompt: String,
    /// Synthesized branch name, unique per invocation.
    pub branch: String,
}

/// Result of a single phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub success: bool,
    /// The phase was intentionally bypassed (`--no-push`, `--keep`), as
    /// opposed to doing nothing because there was nothing to do.
    pub skipped: bool,
    pub message: Option<String>,
}

impl PhaseOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            skipped: false,
            message: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            message: None,
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            message: Some(message.into()),
        }
    }
}

/// Mutable handle produced by a successful work phase and threaded through
/// merge, push, and cleanup. One per stream, never shared.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub config: LifecycleConfig,
    /// The shared mainline checkout.
    pub source_dir: PathBuf,
    /// Mainline branch name at invocation time.
    pub source_branch: String,
    /// Resolved workspace path for `config.branch`.
    pub workspace_path: PathBuf,
}

/// How the stream runner executes its sub-invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All streams at once, headless, joined independently.
    Parallel,
    /// One at a time, interactive, input order.
    Sequential,
    /// Fire and forget; no outcome aggregation.
    Detached,
}

/// Shared template applied to every stream in a batch.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub mode: ExecutionMode,
    pub model: String,
    pub max_budget_usd: String,
    pub permission_mode: String,
    pub from_ref: String,
    pub skip_push: bool,
    pub keep_workspace: bool,
    pub agent_flags: Vec<String>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            model: String::new(),
            max_budget_usd: String::new(),
            permission_mode: String::new(),
            from_ref: String::new(),
            skip_push: false,
            keep_workspace: false,
            agent_flags: Vec::new(),
        }
    }
}

impl RunnerOptions {
    /// Lifecycle config for the invoking process's own merge/push/cleanup
    /// pass over one stream's branch.
    pub fn lifecycle_config(&self, stream: &StreamDescriptor) -> LifecycleConfig {
        LifecycleConfig {
            branch: stream.branch.clone(),
            prompt: stream.prompt.clone(),
            headless: true,
            model: self.model.clone(),
            max_budget_usd: self.max_budget_usd.clone(),
            permission_mode: self.permission_mode.clone(),
            from_ref: self.from_ref.clone(),
            skip_push: self.skip_push,
            keep_workspace: self.keep_workspace,
            work_only: false,
            agent_flags: self.agent_flags.clone(),
        }
    }
}

/// Per-stream aggregate reported by the stream runner.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub stream: StreamDescriptor,
    pub success: bool,
    /// The stream produced no changes — benign, never counted as a failure.
    pub skipped: bool,
    /// Short human-readable reason extracted from trailing diagnostics.
    pub reason: Option<String>,
    pub error: Option<String>,
    pub merged: bool,
    pub pushed: bool,
    pub cleaned: bool,
}

impl StreamOutcome {
    pub fn new(stream: StreamDescriptor) -> Self {
        Self {
            stream,
            success: false,
            skipped: false,
            reason: None,
            error: None,
            merged: false,
            pushed: false,
            cleaned: false,
        }
    }
}
