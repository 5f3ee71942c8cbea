//! Typed error hierarchy for strand.
//!
//! Two top-level enums cover the two subsystems:
//! - `LifecycleError` — fatal failures from a single stream lifecycle
//! - `SplitError` — task decomposition / grouping failures
//!
//! Teardown failures are deliberately absent from the fatal set: cleanup
//! reports a degraded `PhaseOutcome` instead of erroring, so a failed
//! workspace removal can never overwrite a successful merge or push.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures from one stream lifecycle. Every variant that leaves
/// unintegrated work behind carries the preserved workspace path so the
/// rendered message can tell the user where their changes live.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Cannot determine current branch (detached HEAD?)")]
    BranchUnresolvable,

    #[error("Failed to create workspace for branch '{branch}': {message}")]
    WorkspaceCreateFailed { branch: String, message: String },

    #[error("Could not resolve workspace path for branch '{branch}'")]
    WorkspaceNotFound { branch: String },

    #[error("Aborted. Workspace preserved at: {}", workspace.display())]
    Aborted { workspace: PathBuf },

    #[error(
        "No new commits, but workspace has uncommitted changes. \
         Workspace preserved at: {}",
        workspace.display()
    )]
    DirtyWorkspace { workspace: PathBuf },

    #[error(
        "Merge failed (no conflict markers found). Workspace preserved at: {}",
        workspace.display()
    )]
    IntegrationFailed { workspace: PathBuf },

    #[error(
        "Unresolved conflicts remain in:\n{}\nResolve manually:\n  cd {}\n  git add <resolved-files>\n  git commit\nWorkspace preserved at: {}",
        files.join("\n"),
        source_dir.display(),
        workspace.display()
    )]
    IntegrationConflict {
        files: Vec<String>,
        source_dir: PathBuf,
        workspace: PathBuf,
    },

    #[error("Push failed. Retry with: cd {} && git push", source_dir.display())]
    PublishFailed { source_dir: PathBuf },

    #[error("{agent} not found. Install from https://claude.com/claude-code")]
    AgentUnavailable { agent: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures from the task decomposition / grouping step. Parse-shaped
/// variants carry the raw agent response so the caller can surface it for
/// manual fallback.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Agent failed to produce work streams")]
    AgentFailed,

    #[error("Failed to parse work streams from agent response:\n{raw}")]
    ParseFailed { raw: String },

    #[error("Expected non-empty JSON array of work streams, got:\n{raw}")]
    EmptyOrNotArray { raw: String },

    #[error("Invalid work stream (missing id/title/prompt): {item}")]
    InvalidStream { item: String },

    #[error(transparent)]
    Agent(#[from] LifecycleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_conflict_message_names_files_and_recovery() {
        let err = LifecycleError::IntegrationConflict {
            files: vec!["src/a.rs".into(), "src/b.rs".into()],
            source_dir: PathBuf::from("/repo"),
            workspace: PathBuf::from("/repo-wt"),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/a.rs"));
        assert!(msg.contains("src/b.rs"));
        assert!(msg.contains("cd /repo"));
        assert!(msg.contains("git commit"));
        assert!(msg.contains("/repo-wt"));
    }

    #[test]
    fn publish_failed_includes_retry_hint() {
        let err = LifecycleError::PublishFailed {
            source_dir: PathBuf::from("/repo"),
        };
        assert!(err.to_string().contains("cd /repo && git push"));
    }

    #[test]
    fn workspace_create_failed_carries_branch_and_message() {
        let err = LifecycleError::WorkspaceCreateFailed {
            branch: "strand/x-1a2b".into(),
            message: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("strand/x-1a2b"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn split_parse_failed_surfaces_raw_response() {
        let err = SplitError::ParseFailed {
            raw: "I cannot help with that".into(),
        };
        assert!(err.to_string().contains("I cannot help with that"));
    }

    #[test]
    fn split_error_converts_from_lifecycle_error() {
        let inner = LifecycleError::AgentUnavailable {
            agent: "claude".into(),
        };
        let err: SplitError = inner.into();
        assert!(matches!(
            err,
            SplitError::Agent(LifecycleError::AgentUnavailable { .. })
        ));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&LifecycleError::BranchUnresolvable);
        assert_std_error(&SplitError::AgentFailed);
    }
}
