//! Work-execution agent collaborator (Claude Code).
//!
//! The agent is a black box: strand hands it a prompt and flags, inherits
//! its terminal, and reads back nothing but the exit code. Discovery checks
//! the conventional local install path before falling back to `PATH`.

use crate::config::LifecycleConfig;
use crate::errors::LifecycleError;
use crate::exec::{CommandRunner, args};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Display name used in error messages.
const AGENT_NAME: &str = "Claude Code";

/// A resolved agent binary.
#[derive(Debug, Clone)]
pub struct Agent {
    pub command: String,
}

impl Agent {
    /// Find the agent binary: `~/.claude/local/claude` first, then `claude`
    /// and `claude-code` on `PATH`.
    pub async fn locate(runner: &dyn CommandRunner) -> Result<Self, LifecycleError> {
        if let Some(home) = dirs::home_dir() {
            let local = home.join(".claude").join("local").join("claude");
            if local.is_file() {
                return Ok(Self {
                    command: local.to_string_lossy().into_owned(),
                });
            }
        }

        for candidate in ["claude", "claude-code"] {
            let result = runner.run("which", &args(&[candidate]), None).await;
            let path = result.stdout.trim();
            if result.ok() && !path.is_empty() {
                return Ok(Self {
                    command: path.to_string(),
                });
            }
        }

        Err(LifecycleError::AgentUnavailable {
            agent: AGENT_NAME.to_string(),
        })
    }

    /// Agent command line for one lifecycle run: prompt (with `-p` in
    /// headless mode), overrides, then pass-through flags verbatim.
    pub fn build_args(config: &LifecycleConfig) -> Vec<String> {
        let mut argv: Vec<String> = Vec::new();

        if !config.prompt.is_empty() {
            if config.headless {
                argv.push("-p".into());
            }
            argv.push(config.prompt.clone());
        }

        if !config.model.is_empty() {
            argv.push("--model".into());
            argv.push(config.model.clone());
        }
        if !config.max_budget_usd.is_empty() {
            argv.push("--max-budget-usd".into());
            argv.push(config.max_budget_usd.clone());
        }
        if !config.permission_mode.is_empty() {
            argv.push("--permission-mode".into());
            argv.push(config.permission_mode.clone());
        }

        argv.extend(config.agent_flags.iter().cloned());
        argv
    }

    /// Run an agent session in `cwd`, interactive or headless alike with
    /// inherited stdio. Returns the exit code; the caller decides what a
    /// nonzero exit means.
    pub async fn run_session(
        &self,
        runner: &dyn CommandRunner,
        argv: &[String],
        cwd: &Path,
    ) -> i32 {
        runner.run_interactive(&self.command, argv, Some(cwd)).await
    }
}

/// Pid of a running agent process whose working directory is `workspace`,
/// if there is one. `ps` supplies the candidates; `lsof` confirms the cwd,
/// so a session in some other checkout never matches.
pub async fn session_pid(runner: &dyn CommandRunner, workspace: &Path) -> Option<u32> {
    let ps = runner.run("ps", &args(&["aux"]), None).await;
    if !ps.ok() {
        return None;
    }

    let needle = workspace.to_string_lossy();
    for line in ps.stdout.lines() {
        if !(line.contains("claude") || line.contains("claude-code")) || line.contains("grep") {
            continue;
        }
        let Some(pid) = line
            .split_whitespace()
            .nth(1)
            .and_then(|field| field.parse::<u32>().ok())
        else {
            continue;
        };
        let cwd = runner
            .run(
                "lsof",
                &args(&["-p", &pid.to_string(), "-Fn", "-d", "cwd"]),
                None,
            )
            .await;
        if cwd.ok() && cwd.stdout.contains(needle.as_ref()) {
            return Some(pid);
        }
    }
    None
}

/// Copy the mainline checkout's `.claude/` settings directory into the
/// workspace so it inherits trust and permission configuration.
pub fn copy_agent_settings(source_dir: &Path, workspace: &Path) -> Result<()> {
    let settings = source_dir.join(".claude");
    if !settings.exists() {
        return Ok(());
    }
    copy_dir_recursive(&settings, &workspace.join(".claude"))
        .context("Failed to copy agent settings into workspace")
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Location of the agent's global trust file, `~/.claude.json`.
pub fn default_trust_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude.json"))
}

/// Mark a directory as trusted in the agent's global config so the trust
/// dialog is skipped on startup. A missing or unreadable config file starts
/// fresh; an already-trusted entry is left untouched.
pub fn trust_workspace(workspace: &Path, trust_file: &Path) -> Result<()> {
    let abs = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());
    let key = abs.to_string_lossy().into_owned();

    let mut config: serde_json::Value = std::fs::read_to_string(trust_file)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    let projects = config
        .as_object_mut()
        .context("trust file root is not an object")?
        .entry("projects")
        .or_insert_with(|| serde_json::json!({}));
    let projects = projects
        .as_object_mut()
        .context("trust file 'projects' is not an object")?;

    let entry = projects.entry(key).or_insert_with(|| serde_json::json!({}));
    if entry.get("hasTrustDialogAccepted").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(());
    }
    entry
        .as_object_mut()
        .context("trust entry is not an object")?
        .insert("hasTrustDialogAccepted".into(), serde_json::json!(true));

    let rendered = serde_json::to_string_pretty(&config)?;
    std::fs::write(trust_file, rendered + "\n")
        .with_context(|| format!("Failed to write {}", trust_file.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prompt: &str, headless: bool) -> LifecycleConfig {
        LifecycleConfig {
            branch: "strand/x-0000".into(),
            prompt: prompt.into(),
            headless,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn session_pid_matches_agent_cwd() {
        let runner = crate::exec::testing::ScriptedRunner::new();
        runner.push_ok(
            "me  41  0.0  bash\nme  42  1.2  claude --continue\nme  43  0.1  grep claude\n",
        );
        runner.push_ok("p42\nn/strand-x-1a2b\n");

        let pid = session_pid(&runner, Path::new("/strand-x-1a2b")).await;
        assert_eq!(pid, Some(42));

        let calls = runner.calls();
        assert_eq!(calls[0].cmd, "ps");
        assert_eq!(calls[1].cmd, "lsof");
        assert_eq!(calls[1].args, vec!["-p", "42", "-Fn", "-d", "cwd"]);
    }

    #[tokio::test]
    async fn session_pid_ignores_agents_in_other_directories() {
        let runner = crate::exec::testing::ScriptedRunner::new();
        runner.push_ok("me  42  1.2  claude\n");
        runner.push_ok("p42\nn/somewhere/else\n");

        assert_eq!(
            session_pid(&runner, Path::new("/strand-x-1a2b")).await,
            None
        );
    }

    #[test]
    fn build_args_interactive_prompt() {
        let argv = Agent::build_args(&config("Add tests", false));
        assert_eq!(argv, vec!["Add tests"]);
    }

    #[test]
    fn build_args_headless_uses_print_flag() {
        let argv = Agent::build_args(&config("Add tests", true));
        assert_eq!(argv, vec!["-p", "Add tests"]);
    }

    #[test]
    fn build_args_empty_prompt_yields_bare_session() {
        let argv = Agent::build_args(&config("", false));
        assert!(argv.is_empty());
    }

    #[test]
    fn build_args_includes_overrides_and_passthrough() {
        let mut cfg = config("Fix bug", true);
        cfg.model = "sonnet".into();
        cfg.max_budget_usd = "5".into();
        cfg.permission_mode = "plan".into();
        cfg.agent_flags = vec!["--verbose".into(), "--foo".into()];

        let argv = Agent::build_args(&cfg);
        assert_eq!(
            argv,
            vec![
                "-p",
                "Fix bug",
                "--model",
                "sonnet",
                "--max-budget-usd",
                "5",
                "--permission-mode",
                "plan",
                "--verbose",
                "--foo",
            ]
        );
    }

    #[test]
    fn trust_workspace_creates_fresh_config() {
        let dir = tempfile::tempdir().unwrap();
        let trust_file = dir.path().join("claude.json");
        let workspace = dir.path().join("wt");
        std::fs::create_dir(&workspace).unwrap();

        trust_workspace(&workspace, &trust_file).unwrap();

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&trust_file).unwrap()).unwrap();
        let key = workspace.canonicalize().unwrap();
        let entry = &config["projects"][key.to_string_lossy().as_ref()];
        assert_eq!(entry["hasTrustDialogAccepted"], true);
    }

    #[test]
    fn trust_workspace_preserves_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let trust_file = dir.path().join("claude.json");
        std::fs::write(
            &trust_file,
            r#"{"projects": {"/other": {"hasTrustDialogAccepted": true, "note": "keep"}}}"#,
        )
        .unwrap();
        let workspace = dir.path().join("wt");
        std::fs::create_dir(&workspace).unwrap();

        trust_workspace(&workspace, &trust_file).unwrap();

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&trust_file).unwrap()).unwrap();
        assert_eq!(config["projects"]["/other"]["note"], "keep");
        let key = workspace.canonicalize().unwrap();
        assert_eq!(
            config["projects"][key.to_string_lossy().as_ref()]["hasTrustDialogAccepted"],
            true
        );
    }

    #[test]
    fn trust_workspace_tolerates_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        let trust_file = dir.path().join("claude.json");
        std::fs::write(&trust_file, "not json at all").unwrap();
        let workspace = dir.path().join("wt");
        std::fs::create_dir(&workspace).unwrap();

        trust_workspace(&workspace, &trust_file).unwrap();
        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&trust_file).unwrap()).unwrap();
        assert!(config["projects"].is_object());
    }

    #[test]
    fn copy_agent_settings_is_noop_without_settings_dir() {
        let source = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        copy_agent_settings(source.path(), workspace.path()).unwrap();
        assert!(!workspace.path().join(".claude").exists());
    }

    #[test]
    fn copy_agent_settings_copies_nested_files() {
        let source = tempfile::tempdir().unwrap();
        let workspace = tempfile::tempdir().unwrap();
        let nested = source.path().join(".claude").join("commands");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(source.path().join(".claude").join("settings.json"), "{}").unwrap();
        std::fs::write(nested.join("review.md"), "review").unwrap();

        copy_agent_settings(source.path(), workspace.path()).unwrap();

        assert!(workspace.path().join(".claude/settings.json").exists());
        let copied = workspace.path().join(".claude/commands/review.md");
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "review");
    }
}
