//! Git collaborator: the version-control engine invoked as a black-box
//! command. Only the contract the orchestrator relies on is wrapped here —
//! branch resolution, one merge invocation style, conflict scanning, push.
//!
//! The merge always runs `git merge <branch> --no-edit --autostash`; trivial
//! stash/fast-forward cases resolve themselves and anything else surfaces
//! through the exit code.

use crate::exec::{CommandRunner, args};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Outcome of one merge attempt. `output` carries combined stdout/stderr
/// for diagnostics; conflict detection happens separately via
/// [`Git::unmerged_files`].
#[derive(Debug, Clone)]
pub struct MergeAttempt {
    pub success: bool,
    pub output: String,
}

pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Current branch name, empty when detached.
    pub async fn current_branch(&self, cwd: &Path) -> Result<String> {
        let result = self
            .runner
            .run("git", &args(&["branch", "--show-current"]), Some(cwd))
            .await;
        let branch = result.stdout.trim().to_string();
        if !branch.is_empty() {
            return Ok(branch);
        }

        // Older git; may report "HEAD" when detached.
        let result = self
            .runner
            .run(
                "git",
                &args(&["rev-parse", "--abbrev-ref", "HEAD"]),
                Some(cwd),
            )
            .await;
        Ok(result.stdout.trim().to_string())
    }

    /// Top-level directory of the repository containing `cwd`.
    pub async fn repo_root(&self, cwd: &Path) -> Result<PathBuf> {
        let result = self
            .runner
            .run("git", &args(&["rev-parse", "--show-toplevel"]), Some(cwd))
            .await;
        if !result.ok() {
            let msg = result.stderr.trim();
            let msg = if msg.is_empty() {
                "not a git repository"
            } else {
                msg
            };
            bail!("Failed to find git root: {msg}");
        }
        Ok(PathBuf::from(result.stdout.trim()))
    }

    pub async fn rev_parse(&self, reference: &str, cwd: &Path) -> String {
        let result = self
            .runner
            .run("git", &args(&["rev-parse", reference]), Some(cwd))
            .await;
        result.stdout.trim().to_string()
    }

    pub async fn merge(&self, branch: &str, cwd: &Path) -> MergeAttempt {
        let result = self
            .runner
            .run(
                "git",
                &args(&["merge", branch, "--no-edit", "--autostash"]),
                Some(cwd),
            )
            .await;
        MergeAttempt {
            success: result.ok(),
            output: format!("{}{}", result.stdout, result.stderr),
        }
    }

    /// Paths with unmerged index entries. `git ls-files -u` lists each
    /// conflicted path once per stage; duplicates are collapsed preserving
    /// first-seen order.
    pub async fn unmerged_files(&self, cwd: &Path) -> Vec<String> {
        let result = self
            .runner
            .run("git", &args(&["ls-files", "-u"]), Some(cwd))
            .await;
        let mut paths: Vec<String> = Vec::new();
        for line in result.stdout.lines() {
            // "<mode> <hash> <stage>\t<path>"
            if let Some((_, path)) = line.split_once('\t')
                && !paths.iter().any(|p| p == path)
            {
                paths.push(path.to_string());
            }
        }
        paths
    }

    pub async fn abort_merge(&self, cwd: &Path) {
        self.runner
            .run("git", &args(&["merge", "--abort"]), Some(cwd))
            .await;
    }

    pub async fn push(&self, cwd: &Path) -> bool {
        self.runner
            .run("git", &args(&["push"]), Some(cwd))
            .await
            .ok()
    }

    pub async fn has_uncommitted_changes(&self, cwd: &Path) -> bool {
        let result = self
            .runner
            .run("git", &args(&["status", "--porcelain"]), Some(cwd))
            .await;
        !result.stdout.trim().is_empty()
    }

    /// Whether `refs/heads/<branch>` resolves. Bare `rev-parse` echoes an
    /// unresolvable ref back on stdout, so this goes by exit status.
    pub async fn branch_exists(&self, branch: &str, cwd: &Path) -> bool {
        self.runner
            .run(
                "git",
                &args(&[
                    "rev-parse",
                    "--verify",
                    "--quiet",
                    &format!("refs/heads/{branch}"),
                ]),
                Some(cwd),
            )
            .await
            .ok()
    }

    /// Best-effort branch deletion. `force` uses `-D`.
    pub async fn delete_branch(&self, branch: &str, force: bool, cwd: &Path) -> bool {
        let flag = if force { "-D" } else { "-d" };
        self.runner
            .run("git", &args(&["branch", flag, branch]), Some(cwd))
            .await
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;

    #[tokio::test]
    async fn current_branch_uses_show_current() {
        let runner = ScriptedRunner::new();
        runner.push_ok("main\n");

        let git = Git::new(&runner);
        let branch = git.current_branch(Path::new("/repo")).await.unwrap();
        assert_eq!(branch, "main");

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["branch", "--show-current"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(Path::new("/repo")));
    }

    #[tokio::test]
    async fn current_branch_falls_back_to_rev_parse() {
        let runner = ScriptedRunner::new();
        runner.push_ok("").push_ok("develop\n");

        let git = Git::new(&runner);
        let branch = git.current_branch(Path::new("/repo")).await.unwrap();
        assert_eq!(branch, "develop");
        assert_eq!(
            runner.calls()[1].args,
            vec!["rev-parse", "--abbrev-ref", "HEAD"]
        );
    }

    #[tokio::test]
    async fn repo_root_errors_outside_a_repository() {
        let runner = ScriptedRunner::new();
        runner.push_fail("fatal: not a git repository\n");

        let git = Git::new(&runner);
        let err = git.repo_root(Path::new("/tmp")).await.unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[tokio::test]
    async fn merge_uses_no_edit_autostash() {
        let runner = ScriptedRunner::new();
        runner.push_ok("Merge made by the 'ort' strategy.\n");

        let git = Git::new(&runner);
        let attempt = git.merge("strand/x-1a2b", Path::new("/repo")).await;
        assert!(attempt.success);
        assert_eq!(
            runner.calls()[0].args,
            vec!["merge", "strand/x-1a2b", "--no-edit", "--autostash"]
        );
    }

    #[tokio::test]
    async fn merge_failure_carries_combined_output() {
        let runner = ScriptedRunner::new();
        runner.push(crate::exec::ExecOutput {
            stdout: "Auto-merging src/a.rs\n".into(),
            stderr: "CONFLICT (content): Merge conflict in src/a.rs\n".into(),
            exit_code: 1,
        });

        let git = Git::new(&runner);
        let attempt = git.merge("strand/x-1a2b", Path::new("/repo")).await;
        assert!(!attempt.success);
        assert!(attempt.output.contains("Auto-merging"));
        assert!(attempt.output.contains("CONFLICT"));
    }

    #[tokio::test]
    async fn unmerged_files_deduplicates_stages() {
        let runner = ScriptedRunner::new();
        runner.push_ok(
            "100644 abc 1\tsrc/a.rs\n100644 def 2\tsrc/a.rs\n100644 ghi 3\tsrc/a.rs\n100644 jkl 2\tsrc/b.rs\n",
        );

        let git = Git::new(&runner);
        let files = git.unmerged_files(Path::new("/repo")).await;
        assert_eq!(files, vec!["src/a.rs", "src/b.rs"]);
    }

    #[tokio::test]
    async fn unmerged_files_empty_output() {
        let runner = ScriptedRunner::new();
        runner.push_ok("");

        let git = Git::new(&runner);
        assert!(git.unmerged_files(Path::new("/repo")).await.is_empty());
    }

    #[tokio::test]
    async fn push_reports_exit_status() {
        let runner = ScriptedRunner::new();
        runner.push_ok("").push_fail("remote rejected");

        let git = Git::new(&runner);
        assert!(git.push(Path::new("/repo")).await);
        assert!(!git.push(Path::new("/repo")).await);
    }

    #[tokio::test]
    async fn has_uncommitted_changes_checks_porcelain_status() {
        let runner = ScriptedRunner::new();
        runner.push_ok(" M src/a.rs\n").push_ok("\n");

        let git = Git::new(&runner);
        assert!(git.has_uncommitted_changes(Path::new("/wt")).await);
        assert!(!git.has_uncommitted_changes(Path::new("/wt")).await);
    }

    #[tokio::test]
    async fn branch_exists_goes_by_exit_status_not_stdout() {
        let runner = ScriptedRunner::new();
        // rev-parse without --verify echoes the ref name even when it does
        // not resolve, so stdout alone cannot answer this.
        runner.push_ok("abc123\n").push(crate::exec::ExecOutput {
            stdout: "refs/heads/strand/gone\n".into(),
            stderr: String::new(),
            exit_code: 1,
        });

        let git = Git::new(&runner);
        assert!(git.branch_exists("strand/x", Path::new("/repo")).await);
        assert!(!git.branch_exists("strand/gone", Path::new("/repo")).await);

        assert_eq!(
            runner.calls()[0].args,
            vec!["rev-parse", "--verify", "--quiet", "refs/heads/strand/x"]
        );
    }

    #[tokio::test]
    async fn delete_branch_selects_force_flag() {
        let runner = ScriptedRunner::new();
        runner.push_ok("").push_ok("");

        let git = Git::new(&runner);
        git.delete_branch("strand/x", false, Path::new("/repo")).await;
        git.delete_branch("strand/x", true, Path::new("/repo")).await;

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["branch", "-d", "strand/x"]);
        assert_eq!(calls[1].args, vec!["branch", "-D", "strand/x"]);
    }
}
