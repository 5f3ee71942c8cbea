//! Task source: asks the agent to decompose a task (or cluster a backlog)
//! into independent work streams, then extracts and validates the JSON
//! payload from whatever the agent printed around it.
//!
//! Agents decorate their answers — preamble, markdown fences, trailing
//! commentary — so extraction is deliberately permissive: a fenced block
//! wins, then the outermost bracket span, then the raw response. Validation
//! afterwards is strict: a typed decode plus non-empty field checks, with
//! the raw response carried in every error for manual fallback.

use crate::agent::Agent;
use crate::branch::branch_for_task;
use crate::config::StreamDescriptor;
use crate::errors::SplitError;
use crate::exec::CommandRunner;
use crate::ui;
use serde::Deserialize;
use std::path::Path;

/// A stream as the agent describes it, before branch synthesis.
#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    prompt: String,
}

fn decompose_prompt(task: &str) -> String {
    format!(
        "Analyze this task and split it into independent work streams that can be \
         developed in parallel on separate git branches without conflicting with \
         each other:\n\n{task}\n\n\
         Respond with ONLY a JSON array, no other text. Each element must have:\n\
         - \"id\": short kebab-case identifier\n\
         - \"title\": one-line human-readable summary\n\
         - \"prompt\": complete, self-contained instructions for an engineer who \
         sees nothing else\n\n\
         If the task cannot be split, respond with a single-element array covering \
         the whole task."
    )
}

fn group_prompt(items: &str) -> String {
    format!(
        "Here is a backlog of pending work items:\n\n{items}\n\n\
         Group them into independent work streams that can be developed in \
         parallel on separate git branches. Related items belong in one stream; \
         streams must not depend on each other's changes.\n\n\
         Respond with ONLY a JSON array, no other text. Each element must have:\n\
         - \"id\": short kebab-case identifier\n\
         - \"title\": one-line human-readable summary\n\
         - \"prompt\": complete instructions covering every item in the stream"
    )
}

/// Pull the JSON array out of an agent response. Tries, in order: the first
/// fenced code block, the outermost `[`..`]` span, the raw text.
fn extract_payload(response: &str) -> &str {
    if let Some(start) = response.find("```") {
        let after = &response[start + 3..];
        // Skip a language tag on the fence line.
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let (Some(start), Some(end)) = (response.find('['), response.rfind(']'))
        && start < end
    {
        return response[start..=end].trim();
    }

    response.trim()
}

/// Decode and validate the extracted payload into ready-to-run streams,
/// synthesizing a branch per stream.
fn parse_streams(response: &str) -> Result<Vec<StreamDescriptor>, SplitError> {
    let payload = extract_payload(response);

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(payload).map_err(|_| SplitError::ParseFailed {
            raw: response.to_string(),
        })?;
    if raw.is_empty() {
        return Err(SplitError::EmptyOrNotArray {
            raw: response.to_string(),
        });
    }

    let mut streams = Vec::with_capacity(raw.len());
    for item in raw {
        let decoded: RawStream =
            serde_json::from_value(item.clone()).map_err(|_| SplitError::InvalidStream {
                item: item.to_string(),
            })?;
        if decoded.id.trim().is_empty()
            || decoded.title.trim().is_empty()
            || decoded.prompt.trim().is_empty()
        {
            return Err(SplitError::InvalidStream {
                item: item.to_string(),
            });
        }
        let branch = branch_for_task(Some(&decoded.id));
        streams.push(StreamDescriptor {
            id: decoded.id,
            title: decoded.title,
            prompt: decoded.prompt,
            branch,
        });
    }
    Ok(streams)
}

/// One headless agent round-trip with a spinner, returning raw stdout.
async fn ask_agent(
    runner: &dyn CommandRunner,
    agent: &Agent,
    prompt: String,
    model: &str,
    cwd: &Path,
    waiting_msg: &str,
) -> Result<String, SplitError> {
    let mut argv = vec![
        "-p".to_string(),
        prompt,
        "--output-format".to_string(),
        "text".to_string(),
    ];
    if !model.is_empty() {
        argv.push("--model".into());
        argv.push(model.to_string());
    }

    let bar = ui::spinner(waiting_msg);
    let output = runner.run(&agent.command, &argv, Some(cwd)).await;
    bar.finish_and_clear();

    if !output.ok() || output.stdout.trim().is_empty() {
        if !output.stderr.trim().is_empty() {
            ui::plain(output.stderr.trim());
        }
        return Err(SplitError::AgentFailed);
    }
    Ok(output.stdout)
}

/// Decompose one task description into parallel work streams.
pub async fn split_task(
    runner: &dyn CommandRunner,
    agent: &Agent,
    task: &str,
    model: &str,
    cwd: &Path,
) -> Result<Vec<StreamDescriptor>, SplitError> {
    let response = ask_agent(
        runner,
        agent,
        decompose_prompt(task),
        model,
        cwd,
        "Asking agent to split the task...",
    )
    .await?;
    parse_streams(&response)
}

/// Cluster a backlog of pending work items into parallel work streams.
pub async fn group_items(
    runner: &dyn CommandRunner,
    agent: &Agent,
    items: &str,
    model: &str,
    cwd: &Path,
) -> Result<Vec<StreamDescriptor>, SplitError> {
    let response = ask_agent(
        runner,
        agent,
        group_prompt(items),
        model,
        cwd,
        "Asking agent to group the backlog...",
    )
    .await?;
    parse_streams(&response)
}
