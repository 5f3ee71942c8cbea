//! Terminal output helpers and the interactive decision seam.
//!
//! All progress goes to stderr so stdout stays clean for machine-readable
//! output (`status --json`). The [`Decision`] trait lets the phase
//! orchestrator ask continue/abort questions without knowing whether a
//! terminal exists: headless contexts plug in [`AutoContinue`], interactive
//! ones [`TerminalPrompt`].

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn step(msg: impl AsRef<str>) {
    eprintln!("{} {}", style("==>").bold().cyan(), msg.as_ref());
}

pub fn info(msg: impl AsRef<str>) {
    eprintln!("{} {}", style("[OK]").green(), msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    eprintln!("{} {}", style("[!]").yellow(), msg.as_ref());
}

pub fn error(msg: impl AsRef<str>) {
    eprintln!("{} {}", style("[x]").red().bold(), msg.as_ref());
}

pub fn plain(msg: impl AsRef<str>) {
    eprintln!("{}", msg.as_ref());
}

/// Spinner shown while waiting on the agent during decomposition.
pub fn spinner(msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg}")
            .expect("spinner template is a valid static string"),
    );
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// A yes/no decision supplied by the caller. Keeps blocking stdin reads out
/// of the orchestrator core.
pub trait Decision: Send + Sync {
    fn confirm(&self, question: &str, default_yes: bool) -> bool;
}

/// Headless default: always answer with the default.
pub struct AutoContinue;

impl Decision for AutoContinue {
    fn confirm(&self, _question: &str, default_yes: bool) -> bool {
        default_yes
    }
}

/// Blocking terminal prompt for interactive sessions.
pub struct TerminalPrompt;

impl Decision for TerminalPrompt {
    fn confirm(&self, question: &str, default_yes: bool) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(default_yes)
            .interact()
            .unwrap_or(default_yes)
    }
}
