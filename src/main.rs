use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "strand")]
#[command(
    version,
    about = "Run isolated agent work streams in git worktrees and weave them back into your branch"
)]
pub struct Cli {
    /// Repository to operate in. Defaults to the current directory.
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Agent options shared by every command that launches sessions.
#[derive(Args, Clone, Default)]
pub struct AgentOpts {
    /// Agent model override
    #[arg(long)]
    pub model: Option<String>,

    /// Cost ceiling handed to the agent
    #[arg(long)]
    pub max_budget_usd: Option<String>,

    /// Agent permission mode
    #[arg(long)]
    pub permission_mode: Option<String>,

    /// Everything after `--` is passed to the agent verbatim
    #[arg(last = true)]
    pub agent_flags: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one work stream through the full lifecycle
    Run {
        /// Task prompt. Omit for a fresh interactive session.
        prompt: Option<String>,

        /// Branch for the stream's workspace. Auto-named when omitted.
        #[arg(long)]
        branch: Option<String>,

        /// Headless agent invocation (no terminal interaction)
        #[arg(long)]
        headless: bool,

        /// Stop after the work phase; merge later with `strand merge`
        #[arg(long)]
        work_only: bool,

        /// Base ref for the new branch
        #[arg(long)]
        from: Option<String>,

        /// Skip the push phase
        #[arg(long = "no-push")]
        no_push: bool,

        /// Keep the workspace after merging
        #[arg(long)]
        keep: bool,

        #[command(flatten)]
        agent: AgentOpts,
    },

    /// Split a task into parallel work streams and run them all
    Split {
        /// The task to decompose
        task: String,

        /// Run streams one at a time, interactively
        #[arg(long, conflicts_with = "detach")]
        interactive: bool,

        /// Launch each stream as a detached background process
        #[arg(long)]
        detach: bool,

        /// Base ref for every stream branch
        #[arg(long)]
        from: Option<String>,

        /// Skip the push phase
        #[arg(long = "no-push")]
        no_push: bool,

        /// Keep workspaces after merging
        #[arg(long)]
        keep: bool,

        #[command(flatten)]
        agent: AgentOpts,
    },

    /// Group a backlog of work items into streams and run them all
    Group {
        /// File of work items, one per line. `-` reads stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Run streams one at a time, interactively
        #[arg(long, conflicts_with = "detach")]
        interactive: bool,

        /// Launch each stream as a detached background process
        #[arg(long)]
        detach: bool,

        /// Base ref for every stream branch
        #[arg(long)]
        from: Option<String>,

        /// Skip the push phase
        #[arg(long = "no-push")]
        no_push: bool,

        /// Keep workspaces after merging
        #[arg(long)]
        keep: bool,

        #[command(flatten)]
        agent: AgentOpts,
    },

    /// Merge existing stream branches into the current branch
    Merge {
        /// Branches to integrate, in order
        #[arg(required = true)]
        branches: Vec<String>,

        /// Skip the push phase
        #[arg(long = "no-push")]
        no_push: bool,

        /// Keep workspaces after merging
        #[arg(long)]
        keep: bool,
    },

    /// Delete stream branches and their workspaces
    Delete {
        /// Branches to delete
        #[arg(required = true)]
        branches: Vec<String>,

        /// Delete even with unmerged commits
        #[arg(long)]
        force: bool,
    },

    /// Resume the agent in a preserved workspace, then reintegrate
    Rescue {
        /// Branch whose workspace to resume
        branch: String,

        /// Extra instructions for the resumed session
        prompt: Option<String>,

        /// Headless agent invocation
        #[arg(long)]
        headless: bool,

        /// Skip the push phase
        #[arg(long = "no-push")]
        no_push: bool,

        /// Keep the workspace after merging
        #[arg(long)]
        keep: bool,

        #[command(flatten)]
        agent: AgentOpts,
    },

    /// List stream workspaces and their branches
    Status {
        /// Machine-readable output on stdout
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let source_dir = match cli.repo.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let exit = match cli.command {
        Commands::Run {
            ref prompt,
            ref branch,
            headless,
            work_only,
            ref from,
            no_push,
            keep,
            ref agent,
        } => {
            cmd::cmd_run(
                &source_dir,
                branch.as_deref(),
                prompt.as_deref(),
                cmd::RunFlags {
                    headless,
                    work_only,
                    from: from.clone(),
                    no_push,
                    keep,
                },
                agent,
            )
            .await?
        }
        Commands::Split {
            ref task,
            interactive,
            detach,
            ref from,
            no_push,
            keep,
            ref agent,
        } => {
            cmd::cmd_split(
                &source_dir,
                task,
                cmd::batch_options(interactive, detach, from.clone(), no_push, keep, agent),
            )
            .await?
        }
        Commands::Group {
            ref input,
            interactive,
            detach,
            ref from,
            no_push,
            keep,
            ref agent,
        } => {
            cmd::cmd_group(
                &source_dir,
                input,
                cmd::batch_options(interactive, detach, from.clone(), no_push, keep, agent),
            )
            .await?
        }
        Commands::Merge {
            ref branches,
            no_push,
            keep,
        } => cmd::cmd_merge(&source_dir, branches, no_push, keep).await?,
        Commands::Delete {
            ref branches,
            force,
        } => cmd::cmd_delete(&source_dir, branches, force).await?,
        Commands::Rescue {
            ref branch,
            ref prompt,
            headless,
            no_push,
            keep,
            ref agent,
        } => {
            cmd::cmd_rescue(
                &source_dir,
                branch,
                prompt.as_deref(),
                cmd::RunFlags {
                    headless,
                    work_only: false,
                    from: None,
                    no_push,
                    keep,
                },
                agent,
            )
            .await?
        }
        Commands::Status { json } => cmd::cmd_status(&source_dir, json).await?,
    };

    if exit != 0 {
        std::process::exit(exit);
    }
    Ok(())
}
