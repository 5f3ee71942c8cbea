//! End-of-run reporting, for one lifecycle or a whole batch.
//!
//! Rendering is split from printing so the formats are testable; printing
//! goes to stderr like the rest of the progress output.

use crate::config::StreamOutcome;
use crate::lifecycle::LifecycleOutcome;
use crate::ui;
use console::style;

/// One row of the batch table.
pub fn render_stream_line(outcome: &StreamOutcome) -> String {
    if outcome.skipped {
        let reason = outcome.reason.as_deref().unwrap_or("no changes");
        return format!("[SKIP] {} ({}) — {reason}", outcome.stream.title, outcome.stream.branch);
    }
    if outcome.success {
        let mut flags = vec!["merged"];
        if outcome.pushed {
            flags.push("pushed");
        }
        if outcome.cleaned {
            flags.push("cleaned");
        }
        return format!(
            "[ OK ] {} ({}) — {}",
            outcome.stream.title,
            outcome.stream.branch,
            flags.join(", ")
        );
    }
    let error = outcome.error.as_deref().unwrap_or("failed");
    format!("[FAIL] {} ({}) — {error}", outcome.stream.title, outcome.stream.branch)
}

/// Counts line closing the batch table.
pub fn render_batch_counts(outcomes: &[StreamOutcome]) -> String {
    let ok = outcomes.iter().filter(|o| o.success && !o.skipped).count();
    let skipped = outcomes.iter().filter(|o| o.skipped).count();
    let failed = outcomes.iter().filter(|o| !o.success).count();
    format!("{ok} completed, {skipped} skipped, {failed} failed")
}

/// Print the batch table with per-row styling.
pub fn print_batch(outcomes: &[StreamOutcome]) {
    ui::plain("");
    ui::step("Summary");
    for outcome in outcomes {
        let line = render_stream_line(outcome);
        if outcome.skipped {
            ui::plain(style(line).yellow().to_string());
        } else if outcome.success {
            ui::plain(style(line).green().to_string());
        } else {
            ui::plain(style(line).red().to_string());
        }
    }
    ui::plain(render_batch_counts(outcomes));
}

/// Closing line for a single-stream invocation.
pub fn render_lifecycle(outcome: &LifecycleOutcome, branch: &str) -> String {
    match outcome {
        LifecycleOutcome::Completed {
            pushed, cleaned, ..
        } => {
            let mut flags = vec!["merged"];
            if *pushed {
                flags.push("pushed");
            }
            if *cleaned {
                flags.push("cleaned");
            }
            format!("{branch}: {}", flags.join(", "))
        }
        LifecycleOutcome::NoChanges => format!("{branch}: no changes produced"),
        LifecycleOutcome::WorkOnly => {
            format!("{branch}: work complete, merge deferred")
        }
    }
}

pub fn print_lifecycle(outcome: &LifecycleOutcome, branch: &str) {
    ui::plain("");
    match outcome {
        LifecycleOutcome::NoChanges => ui::warn(render_lifecycle(outcome, branch)),
        _ => ui::info(render_lifecycle(outcome, branch)),
    }
}
