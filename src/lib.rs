//! strand — run isolated agent work streams in git worktrees and weave
//! them back into your branch.
//!
//! The core is a four-phase lifecycle per stream (work, merge, push,
//! cleanup) driven by [`lifecycle::run_lifecycle`], and a batch layer
//! ([`runner::StreamRunner`]) that executes many lifecycles as
//! sub-invocations of this binary. Everything that touches the outside
//! world goes through the [`exec::CommandRunner`] seam.

pub mod agent;
pub mod branch;
pub mod config;
pub mod errors;
pub mod exec;
pub mod git;
pub mod lifecycle;
pub mod phases;
pub mod runner;
pub mod split;
pub mod summary;
pub mod ui;
pub mod workspace;
