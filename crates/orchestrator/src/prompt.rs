//! Persona rendering.

use std::fmt;

use crate::workflow::sanitize_task_name;

/// Rendered in place of `{tasks}` when nothing is available.
pub const NO_TASKS_SENTINEL: &str = "none";

/// Separator between task names in `{tasks}` and `{workflow}`.
pub const TASK_SEPARATOR: &str = "→";

/// Header of the block appended when a strategy applies.
pub const STRATEGY_HEADER: &str = "[STRATEGY]";

/// Header of the safety redlines block.
pub const SAFETY_HEADER: &str = "[SAFETY]";

const CODE_PLACEHOLDER: &str = "{code}";
const TASKS_PLACEHOLDER: &str = "{tasks}";
const WORKFLOW_PLACEHOLDER: &str = "{workflow}";

/// Conversation status shown to the model through `{code}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Normal,
    Interrupted,
    Silence,
    Other(u32),
}

impl StatusCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => StatusCode::Normal,
            2 => StatusCode::Interrupted,
            3 => StatusCode::Silence,
            other => StatusCode::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            StatusCode::Normal => 1,
            StatusCode::Interrupted => 2,
            StatusCode::Silence => 3,
            StatusCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Normal => f.write_str("normal"),
            StatusCode::Interrupted => f.write_str("interrupted"),
            StatusCode::Silence => f.write_str("silence"),
            StatusCode::Other(code) => write!(f, "unknown({})", code),
        }
    }
}

fn join_sanitized<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| sanitize_task_name(n.as_ref()))
        .collect::<Vec<_>>()
        .join(TASK_SEPARATOR)
}

/// Render `template` for one turn.
///
/// Placeholders are replaced in a single left-to-right pass, so substituted
/// text is never scanned again and braces that do not open a known
/// placeholder are copied as-is. A non-blank `strategy` is appended as its own
/// block after the template.
///
/// ```rust
/// use orchestrator::{build_persona, StatusCode};
///
/// let persona = build_persona(
///     "状态 {code}，可做：{tasks}",
///     StatusCode::Normal,
///     &["1. 产品介绍*"],
///     &["1. 产品介绍*", "2. 确认身份"],
///     "",
/// );
/// assert_eq!(persona, "状态 normal，可做：产品介绍");
/// ```
pub fn build_persona<A: AsRef<str>, W: AsRef<str>>(
    template: &str,
    status: StatusCode,
    available: &[A],
    workflow: &[W],
    strategy: &str,
) -> String {
    let code = status.to_string();
    let tasks = if available.is_empty() {
        NO_TASKS_SENTINEL.to_string()
    } else {
        join_sanitized(available)
    };
    let workflow = join_sanitized(workflow);

    let mut out = String::with_capacity(template.len() + tasks.len() + workflow.len());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let replacement = [
            (CODE_PLACEHOLDER, code.as_str()),
            (TASKS_PLACEHOLDER, tasks.as_str()),
            (WORKFLOW_PLACEHOLDER, workflow.as_str()),
        ]
        .into_iter()
        .find(|(placeholder, _)| tail.starts_with(placeholder));

        match replacement {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    let strategy = strategy.trim();
    if !strategy.is_empty() {
        out.push_str("\n\n");
        out.push_str(STRATEGY_HEADER);
        out.push('\n');
        out.push_str(strategy);
    }
    out
}

/// Append `redlines` to a rendered persona as its own block.
///
/// Blank redlines leave the persona untouched. The text is not scanned for
/// placeholders.
pub fn append_redlines(mut persona: String, redlines: &str) -> String {
    let redlines = redlines.trim();
    if !redlines.is_empty() {
        persona.push_str("\n\n");
        persona.push_str(SAFETY_HEADER);
        persona.push('\n');
        persona.push_str(redlines);
    }
    persona
}
