//! `strand status` — list registered workspaces. Human-readable on stderr
//! by default; `--json` prints the registry on stdout for scripting.

use anyhow::Result;
use console::style;
use serde_json::json;
use std::path::Path;
use strand::agent::session_pid;
use strand::branch::in_namespace;
use strand::exec::ProcessRunner;
use strand::git::Git;
use strand::ui;
use strand::workspace::WorkspaceManager;

pub async fn cmd_status(source_dir: &Path, json: bool) -> Result<i32> {
    let runner = ProcessRunner;
    let manager = WorkspaceManager::new(&runner, source_dir);
    let entries = manager.list().await;

    if entries.is_empty() {
        if json {
            println!("[]");
            return Ok(0);
        }
        ui::warn("No worktrees found (not a git repository?)");
        return Ok(1);
    }

    let git = Git::new(&runner);
    let mut rows = Vec::with_capacity(entries.len());
    for entry in &entries {
        let dirty = git.has_uncommitted_changes(&entry.path).await;
        let session = session_pid(&runner, &entry.path).await;
        rows.push((entry, dirty, session));
    }

    if json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(entry, dirty, session)| {
                json!({
                    "branch": entry.branch,
                    "path": entry.path,
                    "head": entry.head,
                    "is_main": entry.is_main,
                    "stream": in_namespace(&entry.branch),
                    "dirty": dirty,
                    "session_running": session.is_some(),
                    "session_pid": session,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(0);
    }

    let streams = entries.iter().filter(|e| in_namespace(&e.branch)).count();
    ui::step(format!("{streams} stream workspace(s)"));
    for (entry, dirty, session) in &rows {
        let marker = if entry.is_main {
            style("main").cyan().to_string()
        } else if in_namespace(&entry.branch) {
            style("stream").green().to_string()
        } else {
            style("other").dim().to_string()
        };
        let branch = if entry.branch.is_empty() {
            "(detached)"
        } else {
            &entry.branch
        };
        let mut suffix = String::new();
        if *dirty {
            suffix.push_str("  (dirty)");
        }
        if let Some(pid) = session {
            suffix.push_str(&format!(
                "  {}",
                style(format!("agent running (pid {pid})")).green()
            ));
        }
        ui::plain(format!(
            "  [{marker}] {branch}  {}{suffix}",
            entry.path.display()
        ));
    }
    Ok(0)
}
