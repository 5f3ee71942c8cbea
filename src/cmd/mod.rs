//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Command handled                                  |
//! |----------|--------------------------------------------------|
//! | `run`    | `Run` — one stream, full lifecycle               |
//! | `split`  | `Split`, `Group` — batch decomposition + runner  |
//! | `merge`  | `Merge` — reintegrate existing stream branches   |
//! | `delete` | `Delete` — drop branches and their workspaces    |
//! | `rescue` | `Rescue` — resume a preserved workspace          |
//! | `status` | `Status` — list workspaces                       |
//!
//! Commands resolve all ambient state here — working directory, own
//! executable, agent binary, trust file, terminal — and hand the library
//! explicit configuration. Every function returns the process exit code;
//! fatal setup errors propagate as `anyhow::Error` instead.

pub mod delete;
pub mod merge;
pub mod rescue;
pub mod run;
pub mod split;
pub mod status;

pub use delete::cmd_delete;
pub use merge::cmd_merge;
pub use rescue::cmd_rescue;
pub use run::{RunFlags, cmd_run};
pub use split::{cmd_group, cmd_split};
pub use status::cmd_status;

use crate::AgentOpts;
use strand::config::{ExecutionMode, RunnerOptions};

/// Build the batch template shared by `split` and `group`.
pub fn batch_options(
    interactive: bool,
    detach: bool,
    from: Option<String>,
    no_push: bool,
    keep: bool,
    agent: &AgentOpts,
) -> RunnerOptions {
    let mode = if detach {
        ExecutionMode::Detached
    } else if interactive {
        ExecutionMode::Sequential
    } else {
        ExecutionMode::Parallel
    };
    RunnerOptions {
        mode,
        model: agent.model.clone().unwrap_or_default(),
        max_budget_usd: agent.max_budget_usd.clone().unwrap_or_default(),
        permission_mode: agent.permission_mode.clone().unwrap_or_default(),
        from_ref: from.unwrap_or_default(),
        skip_push: no_push,
        keep_workspace: keep,
        agent_flags: agent.agent_flags.clone(),
    }
}
