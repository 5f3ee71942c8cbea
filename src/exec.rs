//! Subprocess execution collaborator.
//!
//! Everything strand does to the outside world — git subcommands, agent
//! sessions, its own sub-invocations — goes through [`CommandRunner`]. The
//! trait exposes three distinct named operations rather than one call with
//! mode flags:
//!
//! - [`CommandRunner::run`] — run to completion, capture output and exit code
//! - [`CommandRunner::run_interactive`] — inherit stdio, return exit code
//! - [`CommandRunner::spawn_detached`] — launch and return immediately with
//!   a process identifier
//!
//! Orchestrator logic is written against the trait so tests can script
//! responses without touching real processes.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a completed subprocess.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn ok(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing stdout and stderr.
    ///
    /// Spawn failures are folded into the result as exit code 1 with the
    /// error text on stderr; callers branch on the exit code either way.
    async fn run(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> ExecOutput;

    /// Run a command with inherited stdio (the agent owns the terminal).
    /// Returns the exit code, 1 on spawn failure.
    async fn run_interactive(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> i32;

    /// Launch a command without waiting for it. Returns the child's process
    /// id for out-of-band inspection.
    fn spawn_detached(
        &self,
        cmd: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> std::io::Result<u32>;
}

/// The real runner, backed by `tokio::process`.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> ExecOutput {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::debug!(cmd, ?args, ?cwd, "exec");

        match command.output().await {
            Ok(output) => ExecOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(1),
            },
            Err(err) => ExecOutput {
                stdout: String::new(),
                stderr: err.to_string(),
                exit_code: 1,
            },
        }
    }

    async fn run_interactive(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> i32 {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        tracing::debug!(cmd, ?args, ?cwd, "exec interactive");

        match command.status().await {
            Ok(status) => status.code().unwrap_or(1),
            Err(_) => 1,
        }
    }

    fn spawn_detached(
        &self,
        cmd: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> std::io::Result<u32> {
        let mut command = std::process::Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let child = command.spawn()?;
        let pid = child.id();
        tracing::debug!(cmd, ?args, pid, "spawned detached");
        Ok(pid)
    }
}

/// Convenience for building owned arg vectors at call sites.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner for unit tests: queue responses in call order the
    //! way the original test suite mocked its exec layer.

    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub cmd: String,
        pub args: Vec<String>,
        pub cwd: Option<PathBuf>,
    }

    #[derive(Default)]
    pub struct ScriptedRunner {
        responses: Mutex<VecDeque<ExecOutput>>,
        interactive_codes: Mutex<VecDeque<i32>>,
        calls: Mutex<Vec<RecordedCall>>,
        detached: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the result for the next `run` call.
        pub fn push(&self, output: ExecOutput) -> &Self {
            self.responses.lock().unwrap().push_back(output);
            self
        }

        pub fn push_ok(&self, stdout: &str) -> &Self {
            self.push(ExecOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
            })
        }

        pub fn push_fail(&self, stderr: &str) -> &Self {
            self.push(ExecOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: 1,
            })
        }

        /// Queue the exit code for the next `run_interactive` call.
        pub fn push_interactive(&self, code: i32) -> &Self {
            self.interactive_codes.lock().unwrap().push_back(code);
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn detached_calls(&self) -> Vec<RecordedCall> {
            self.detached.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> ExecOutput {
            self.calls.lock().unwrap().push(RecordedCall {
                cmd: cmd.to_string(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted run: {cmd} {args:?}"))
        }

        async fn run_interactive(&self, cmd: &str, args: &[String], cwd: Option<&Path>) -> i32 {
            self.calls.lock().unwrap().push(RecordedCall {
                cmd: cmd.to_string(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            self.interactive_codes.lock().unwrap().pop_front().unwrap_or(0)
        }

        fn spawn_detached(
            &self,
            cmd: &str,
            args: &[String],
            cwd: Option<&Path>,
        ) -> std::io::Result<u32> {
            let mut detached = self.detached.lock().unwrap();
            detached.push(RecordedCall {
                cmd: cmd.to_string(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            Ok(10_000 + detached.len() as u32)
        }
    }
}
