//! The four-phase lifecycle state machine, one file per phase:
//!
//! Work (materialize + execute) → Merge (integrate) → Push (publish) →
//! Cleanup (teardown), with two early exits out of the work phase: nothing
//! to merge (workspace torn down, nothing to preserve) and aborted
//! (workspace always preserved).

mod cleanup;
mod merge;
mod push;
mod work;

pub use cleanup::phase_cleanup;
pub use merge::phase_merge;
pub use push::phase_push;
pub use work::{WorkOutcome, phase_work};

use crate::agent::Agent;
use crate::exec::CommandRunner;
use crate::ui::Decision;
use std::path::PathBuf;

/// Collaborators shared by every phase, resolved once by the command layer.
/// Phases never look anything up from ambient process state.
pub struct PhaseEnv<'a> {
    pub runner: &'a dyn CommandRunner,
    pub agent: Agent,
    pub decision: &'a dyn Decision,
    /// Agent trust file to update before launching sessions in a fresh
    /// workspace. `None` skips trust propagation.
    pub trust_file: Option<PathBuf>,
}
