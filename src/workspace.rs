//! Workspace manager: creates, locates, and destroys the isolated worktree
//! bound to a branch.
//!
//! Workspaces live in a flat namespace as siblings of the repository root,
//! one directory per branch, named by flattening path separators out of the
//! branch name. A branch maps to at most one live workspace at a time; git's
//! own worktree registry is the source of truth for the mapping.

use crate::branch::workspace_dir_name;
use crate::errors::LifecycleError;
use crate::exec::{CommandRunner, args};
use crate::git::Git;
use std::path::PathBuf;

pub struct WorkspaceManager<'a> {
    runner: &'a dyn CommandRunner,
    /// The shared mainline checkout all git worktree commands run in.
    source_dir: PathBuf,
}

impl<'a> WorkspaceManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            source_dir: source_dir.into(),
        }
    }

    /// Target directory for a branch's workspace: `<repo-root>/../<flat name>`.
    pub async fn workspace_dir(&self, branch: &str) -> Result<PathBuf, LifecycleError> {
        let root = Git::new(self.runner)
            .repo_root(&self.source_dir)
            .await
            .map_err(LifecycleError::Other)?;
        let parent = root.parent().unwrap_or(&root);
        Ok(parent.join(workspace_dir_name(branch)))
    }

    /// Idempotent create-or-reuse. Tries to create a fresh branch, falls
    /// back to attaching an existing branch, and treats an already
    /// registered workspace as warning-level reuse. Fails only when every
    /// path is exhausted.
    pub async fn materialize(
        &self,
        branch: &str,
        from_ref: Option<&str>,
    ) -> Result<PathBuf, LifecycleError> {
        let target = self.workspace_dir(branch).await?;
        let target_str = target.to_string_lossy().into_owned();

        let mut add_args = args(&["worktree", "add", "-b", branch, &target_str]);
        if let Some(base) = from_ref {
            add_args.push(base.to_string());
        }
        let created = self
            .runner
            .run("git", &add_args, Some(&self.source_dir))
            .await;

        let fallback = if created.ok() {
            None
        } else {
            // Branch may already exist — attach it instead of creating.
            Some(
                self.runner
                    .run(
                        "git",
                        &args(&["worktree", "add", &target_str, branch]),
                        Some(&self.source_dir),
                    )
                    .await,
            )
        };

        if let Some(fallback) = fallback
            && !fallback.ok()
        {
            if let Some(existing) = self.locate(branch).await {
                tracing::warn!(branch, path = %existing.display(), "workspace already exists, reusing");
                return Ok(existing);
            }
            let message = [fallback.stderr.trim(), created.stderr.trim(), "unknown error"]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or("unknown error")
                .to_string();
            return Err(LifecycleError::WorkspaceCreateFailed {
                branch: branch.to_string(),
                message,
            });
        }

        // Resolve through the registry rather than trusting the target we
        // computed; git normalizes the path.
        self.locate(branch)
            .await
            .ok_or_else(|| LifecycleError::WorkspaceNotFound {
                branch: branch.to_string(),
            })
    }

    /// Registered workspace path for a branch, if any.
    pub async fn locate(&self, branch: &str) -> Option<PathBuf> {
        let result = self
            .runner
            .run(
                "git",
                &args(&["worktree", "list", "--porcelain"]),
                Some(&self.source_dir),
            )
            .await;
        if !result.ok() {
            return None;
        }

        let needle = format!("branch refs/heads/{branch}");
        for entry in result.stdout.split("\n\n") {
            if entry.lines().any(|l| l.trim() == needle) {
                for line in entry.lines() {
                    if let Some(path) = line.strip_prefix("worktree ") {
                        return Some(PathBuf::from(path));
                    }
                }
            }
        }
        None
    }

    pub async fn exists(&self, branch: &str) -> bool {
        self.locate(branch).await.is_some()
    }

    /// Best-effort removal: drop the worktree, then best-effort delete the
    /// branch. Returns `false` (leaving the branch alone) when removal
    /// fails; callers downgrade that to a warning.
    pub async fn destroy(&self, branch: &str) -> bool {
        let Ok(target) = self.workspace_dir(branch).await else {
            return false;
        };
        let target_str = target.to_string_lossy().into_owned();

        let removed = self
            .runner
            .run(
                "git",
                &args(&["worktree", "remove", &target_str, "--force"]),
                Some(&self.source_dir),
            )
            .await;

        if removed.ok() {
            let git = Git::new(self.runner);
            git.delete_branch(branch, false, &self.source_dir).await;
            true
        } else {
            if !removed.stderr.trim().is_empty() {
                tracing::warn!(branch, "worktree remove failed: {}", removed.stderr.trim());
            }
            false
        }
    }

    /// All registered worktrees, mainline first (git lists it first).
    pub async fn list(&self) -> Vec<WorktreeEntry> {
        let result = self
            .runner
            .run(
                "git",
                &args(&["worktree", "list", "--porcelain"]),
                Some(&self.source_dir),
            )
            .await;
        if !result.ok() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for (idx, block) in result.stdout.trim().split("\n\n").enumerate() {
            if block.trim().is_empty() {
                continue;
            }
            let mut path = String::new();
            let mut head = String::new();
            let mut branch = String::new();
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("worktree ") {
                    path = rest.to_string();
                } else if let Some(rest) = line.strip_prefix("HEAD ") {
                    head = rest.to_string();
                } else if let Some(rest) = line.strip_prefix("branch ") {
                    branch = rest.trim_start_matches("refs/heads/").to_string();
                }
            }
            if !path.is_empty() {
                entries.push(WorktreeEntry {
                    path: PathBuf::from(path),
                    branch,
                    head,
                    is_main: idx == 0,
                });
            }
        }
        entries
    }

}

/// One row of `git worktree list`.
#[derive(Debug, Clone)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: String,
    pub head: String,
    pub is_main: bool,
}
