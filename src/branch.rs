//! Branch and workspace naming.
//!
//! Branches live under a single namespace: `strand/<slug>-<4 hex>`. The
//! slug comes from a stream id when one exists, otherwise from the date.
//! The random suffix keeps repeated invocations with the same title from
//! colliding.

use chrono::Local;

/// Namespace prefix for every branch strand creates.
pub const BRANCH_NAMESPACE: &str = "strand";

/// Maximum slug length before the random suffix.
const MAX_SLUG_LEN: usize = 24;

/// Lower-case, collapse non-alphanumeric runs to single dashes, truncate.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true; // suppress leading dash
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Synthesize a branch name from a stream id, or from today's date when no
/// id is available.
pub fn branch_for_task(id: Option<&str>) -> String {
    let slug = match id.map(slugify) {
        Some(s) if !s.is_empty() => s,
        _ => format!("task-{}", Local::now().format("%Y%m%d")),
    };
    let suffix: u16 = rand::random();
    format!("{BRANCH_NAMESPACE}/{slug}-{suffix:04x}")
}

/// Directory name for a branch's workspace: path separators flattened so
/// hierarchical branch names never nest under git's own worktree
/// bookkeeping.
pub fn workspace_dir_name(branch: &str) -> String {
    branch.replace('/', "-")
}

/// Whether a branch belongs to strand's namespace.
pub fn in_namespace(branch: &str) -> bool {
    branch.starts_with(&format!("{BRANCH_NAMESPACE}/"))
}
